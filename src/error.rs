//! Application Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Library errors are raised into one
//! of these kinds so the whole tree is reported when the process exits.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not prepare staging storage")]
    Storage,
    #[display("could not set up the naming service")]
    Naming,
    #[display("HTTP server failed")]
    Server,
    #[display("could not read {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("could not write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    /// The batch did not complete.
    #[display("batch rename did not complete: {_0}")]
    Batch(#[error(not(source))] String),
}
