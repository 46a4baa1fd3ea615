//! Prelude module - common imports for tabula users
//!
//! ```rust
//! use tabula::prelude::*;
//! ```

pub use crate::{
    // Style types
    Alignment,
    BorderLineStyle,
    BorderStyle,
    // Cell types
    CellAddress,
    CellRange,
    CellValue,
    // Chart types
    Chart,
    ColumnSizing,
    Color,
    // Data validation types
    DataValidation,
    // Error types
    Error,
    FontStyle,
    HorizontalAlignment,
    Hyperlink,
    LineOptions,
    MarkerStyle,
    Result,
    Series,
    Style,
    StyleMerge,
    ValidationOperator,
    VerticalAlignment,
    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,
    // I/O types
    XlsxError,
    XlsxReader,
    XlsxWriter,
};
