//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Content of a part could not be interpreted
    #[error("Parse error in {part}: {message}")]
    Parse { part: String, message: String },

    /// Model invariant violated
    #[error("Core error: {0}")]
    Core(#[from] tabula_core::Error),
}

impl XlsxError {
    pub(crate) fn parse(part: &str, message: impl Into<String>) -> Self {
        XlsxError::Parse {
            part: part.to_string(),
            message: message.into(),
        }
    }
}
