//! Error types for tabula-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or validating a document model
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A required name was empty or whitespace
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid defined name
    #[error("Invalid named range: {0}")]
    InvalidName(String),

    /// Duplicate defined name
    #[error("Named range already exists: {0}")]
    DuplicateName(String),

    /// Named range points at a sheet that is not in the workbook
    #[error("Named range '{name}' refers to unknown sheet '{sheet}'")]
    DanglingNamedRange { name: String, sheet: String },

    /// Merge region intersects an existing one
    #[error("Merge {new} overlaps existing merge {existing}")]
    MergeOverlap { new: String, existing: String },

    /// Operator and bound count disagree
    #[error("Validation operator {operator} requires {expected} bound(s)")]
    InvalidCriterion {
        operator: &'static str,
        expected: usize,
    },

    /// Chart series data lives on a sheet that is not in the workbook
    #[error("Chart on sheet '{sheet}' reads data from unknown sheet '{source_sheet}'")]
    UnknownChartSource { sheet: String, source_sheet: String },

    /// NaN or infinite numeric cell value
    #[error("Non-finite number for {0}")]
    NonFiniteNumber(String),

    /// Workbook has no sheets to write
    #[error("Workbook contains no worksheets")]
    NoWorksheets,
}
