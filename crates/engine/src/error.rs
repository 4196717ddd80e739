//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the storage, naming,
//! and archive crates are raised into [`ErrorKind::Storage`],
//! [`ErrorKind::InvalidMode`] and [`ErrorKind::Archive`] so their trees
//! stay attached.

use derive_more::{Display, Error};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies what went wrong from the caller's point of view.
///
/// ### User Input
/// - [`ErrorKind::NoFilesStaged`]
/// - [`ErrorKind::InvalidMode`]
///
/// ### State Conflicts
/// - [`ErrorKind::AlreadyRunning`]
/// - [`ErrorKind::InvalidState`]
/// - [`ErrorKind::NothingToExport`]
///
/// ### Credentials
/// - [`ErrorKind::MissingCredential`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Archive`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("no files staged")]
    NoFilesStaged,
    #[display("invalid mode {_0:?}: expected \"text\" or \"image\"")]
    InvalidMode(#[error(not(source))] String),
    #[display("a rename job is already running")]
    AlreadyRunning,
    /// The operation is not allowed while a job is running.
    #[display("cannot {_0} while a rename job is running")]
    InvalidState(#[error(not(source))] &'static str),
    #[display("no API key configured for the naming service")]
    MissingCredential,
    /// Export needs a completed job with at least one renamed file.
    #[display("nothing to export: no completed rename job")]
    NothingToExport,
    /// Reading or writing staged content failed.
    #[display("staging storage failed")]
    Storage,
    /// Packaging the archive failed.
    #[display("archive packaging failed")]
    Archive,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::Storage)
    }
}
