//! Data series types

use crate::cell::CellRange;

/// One plotted series.
///
/// For scatter charts `categories` holds the X values and `values` the Y values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    /// Series name shown in the legend
    pub name: Option<String>,
    /// Category (or X) range
    pub categories: CellRange,
    /// Value (or Y) range
    pub values: CellRange,
}

impl Series {
    /// Create a new data series
    pub fn new(categories: CellRange, values: CellRange) -> Self {
        Self {
            name: None,
            categories,
            values,
        }
    }

    /// Set series name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}
