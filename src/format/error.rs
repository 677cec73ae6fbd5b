//! Error types for label codec and export operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing label files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A label line could not be parsed
    #[error("Line {line}: {message}")]
    InvalidLine {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// Export mode name not recognized
    #[error("Unknown export mode '{0}' (expected 'bbox' or 'obb')")]
    UnknownMode(String),

    /// Output path exists and is not a directory
    #[error("Not a directory: {path:?}")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },
}

impl FormatError {
    /// Create an invalid line error.
    pub fn invalid_line(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidLine {
            line,
            message: message.into(),
        }
    }
}
