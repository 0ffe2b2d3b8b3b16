//! Error types for the exfac-core library.

use thiserror::Error;

/// Main error type for the exfac library.
#[derive(Error, Debug)]
pub enum ExfacError {
    /// Workbook could not be opened or decoded.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a file into a [`crate::grid::Grid`].
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file extension is not a spreadsheet format we can decode.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The spreadsheet decoder rejected the file.
    #[error("failed to decode workbook: {0}")]
    Decode(String),

    /// The workbook has no worksheet to read.
    #[error("workbook has no worksheets")]
    NoWorksheet,
}

impl From<calamine::Error> for LoadError {
    fn from(err: calamine::Error) -> Self {
        LoadError::Decode(err.to_string())
    }
}

impl From<calamine::XlsxError> for LoadError {
    fn from(err: calamine::XlsxError) -> Self {
        LoadError::Decode(err.to_string())
    }
}

/// Result type for the exfac library.
pub type Result<T> = std::result::Result<T, ExfacError>;
