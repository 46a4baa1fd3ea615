//! # tabula-core
//!
//! Core data structures for the tabula spreadsheet library.
//!
//! This crate provides the document model that the xlsx writer and reader
//! operate on:
//! - [`CellValue`] - Cell values (text, numbers, booleans, dates, formulas)
//! - [`CellAddress`] and [`CellRange`] - Zero-based cell addressing and ranges
//! - [`Style`] - Immutable cell formatting, interned per save by [`StyleRegistry`]
//! - [`Workbook`], [`Worksheet`] - The main document structures
//! - [`Chart`], [`DataValidation`], [`NamedRange`] - Sheet and workbook objects
//! - [`autofit`] - Font-metric column width estimation
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CellAddress, Style, StyleMerge, Workbook};
//!
//! let mut workbook = Workbook::new("Report");
//! let sheet = workbook.add_worksheet("Data").unwrap();
//!
//! sheet.set_value(CellAddress::new(0, 0), "Hello").unwrap();
//! sheet
//!     .add_cell(
//!         CellAddress::parse("B1").unwrap(),
//!         42,
//!         StyleMerge::Replace(Some(Style::new().bold(true))),
//!     )
//!     .unwrap();
//!
//! assert_eq!(sheet.cell_count(), 2);
//! ```

pub mod autofit;
pub mod cell;
pub mod chart;
pub mod error;
pub mod named_range;
pub mod style;
pub mod validation;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use autofit::{
    auto_fit_columns, estimate_text_width, to_column_width_units, FontMetrics, HeuristicMetrics,
    AUTO_FIT_PADDING, DEFAULT_CALIBRATION_FACTOR, MAX_COLUMN_WIDTH, MIN_COLUMN_WIDTH,
};
#[cfg(feature = "fonts")]
pub use autofit::SystemFontMetrics;
pub use cell::{
    column_letters, column_number, datetime_to_serial, serial_to_datetime, Cell, CellAddress,
    CellRange, CellValue,
};
pub use chart::{BarDirection, Chart, ChartKind, LineOptions, MarkerStyle, Series};
pub use error::{Error, Result};
pub use named_range::NamedRange;
pub use validation::{
    Criterion, DataValidation, ListSource, ValidationErrorStyle, ValidationMessage,
    ValidationOperator, ValidationRule,
};
pub use workbook::Workbook;
pub use worksheet::{ColumnSizing, FreezePane, StyleMerge, Worksheet};

// Re-export all style types for convenience
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FontStyle, HorizontalAlignment,
    Hyperlink, Style, StyleId, StyleRegistry, VerticalAlignment,
};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
