//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested format is not supported.
    #[display("unsupported archive format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// An entry name cannot be stored in the archive.
    #[display("invalid entry name: {_0:?}")]
    InvalidEntryName(#[error(not(source))] String),
    /// The archive writer failed while encoding.
    #[display("archive encoding failed")]
    Encoder,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::UnsupportedFormat("rar".to_string()).to_string(), "unsupported archive format: rar");
        assert_eq!(ErrorKind::InvalidEntryName(String::new()).to_string(), "invalid entry name: \"\"");
        assert_eq!(ErrorKind::Encoder.to_string(), "archive encoding failed");
    }
}
