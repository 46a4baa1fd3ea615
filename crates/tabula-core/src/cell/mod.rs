//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A normalized rectangle of cells (e.g., "A1:B10")
//! - [`Cell`] - A value plus its optional style

mod address;
mod value;

pub use address::{
    column_letters, column_number, parse_sheet_reference, quote_sheet_name, sheet_reference,
    CellAddress, CellRange,
};
pub use value::{datetime_to_serial, serial_to_datetime, CellValue};

use crate::style::Style;
use std::sync::Arc;

/// A populated cell: value plus an optional style
///
/// `None` means the workbook default style. Styles are shared values, so many
/// cells can hold the same `Arc<Style>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// The cell's value
    pub value: CellValue,
    /// Explicit style, if any
    pub style: Option<Arc<Style>>,
}

impl Cell {
    /// Create an unstyled cell
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            style: None,
        }
    }

    /// Create a cell with an explicit style
    pub fn styled(value: impl Into<CellValue>, style: Style) -> Self {
        Self {
            value: value.into(),
            style: Some(Arc::new(style)),
        }
    }

    /// The style this cell renders with, given the workbook default
    pub fn effective_style<'a>(&'a self, default: &'a Style) -> &'a Style {
        self.style.as_deref().unwrap_or(default)
    }
}
