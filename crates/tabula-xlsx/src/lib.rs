//! # tabula-xlsx
//!
//! XLSX (Office Open XML) reader and writer for tabula.
//!
//! [`XlsxWriter`] turns a [`tabula_core::Workbook`] into a zip-of-XML
//! package. Output is deterministic: saving an unchanged workbook twice
//! yields identical bytes. [`XlsxReader`] rebuilds a workbook from such a
//! package, skipping (and logging) features it does not model.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
