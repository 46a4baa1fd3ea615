//! # tabula
//!
//! Build spreadsheets in code, save them as `.xlsx`, and load them back.
//!
//! ## Features
//!
//! - Typed cell values: text, integers, decimals, booleans, dates, formulas
//! - Immutable styles, interned per save so output stays compact
//! - Bar, line, pie and scatter charts
//! - Data validations, merges, freeze panes, hyperlinks and named ranges
//! - Column auto-fit from font metrics, with a per-sheet calibration factor
//! - Deterministic output: saving an unchanged workbook twice gives identical bytes
//!
//! ## Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let mut workbook = Workbook::new("Report");
//! let sheet = workbook.add_worksheet("Data").unwrap();
//!
//! sheet
//!     .add_row(0, 0, ["Region", "Sales"], StyleMerge::Replace(Some(Style::new().bold(true))))
//!     .unwrap();
//! sheet.add_row(1, 0, [CellValue::from("North"), CellValue::from(1250)], StyleMerge::Preserve)
//!     .unwrap();
//!
//! let bytes = XlsxWriter::new().to_bytes(&workbook).unwrap();
//! let loaded = XlsxReader::read(std::io::Cursor::new(bytes)).unwrap();
//! assert_eq!(loaded.worksheet(0).unwrap().cell_count(), 4);
//!
//! // tabula::save_to_file(&workbook, "report.xlsx").unwrap();
//! ```

pub mod prelude;

use std::path::Path;

use tempfile::NamedTempFile;

// Re-export core types
pub use tabula_core::{
    autofit, cell, chart, named_range, style, validation, Alignment, BarDirection, BorderEdge,
    BorderLineStyle, BorderStyle, Cell, CellAddress, CellRange, CellValue, Chart, ChartKind,
    Color, ColumnSizing, Criterion, DataValidation, Error, FontMetrics, FontStyle, FreezePane,
    HeuristicMetrics, HorizontalAlignment, Hyperlink, LineOptions, ListSource, MarkerStyle,
    NamedRange, Result, Series, Style, StyleId, StyleMerge, StyleRegistry, ValidationErrorStyle,
    ValidationMessage, ValidationOperator, ValidationRule, VerticalAlignment, Workbook, Worksheet,
    MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

#[cfg(feature = "fonts")]
pub use tabula_core::SystemFontMetrics;

// Re-export I/O types
pub use tabula_xlsx::{XlsxError, XlsxReader, XlsxResult, XlsxWriter};

/// Save a workbook as an xlsx file, auto-fitting with the default metrics.
///
/// The package is written to a temporary file next to `path` and renamed
/// over it once complete, so a failed save leaves any existing file intact.
pub fn save_to_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
    save_with(&XlsxWriter::new(), workbook, path)
}

/// [`save_to_file`] with a configured writer
pub fn save_with<P: AsRef<Path>>(
    writer: &XlsxWriter,
    workbook: &Workbook,
    path: P,
) -> XlsxResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    writer.write(workbook, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    log::debug!("saved workbook '{}' to {}", workbook.name(), path.display());
    Ok(())
}

/// Load an xlsx file. A workbook without a stored title takes the file stem.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
    XlsxReader::read_file(path)
}

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt: Sized {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        load_from_file(path)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        save_to_file(self, path)
    }
}
