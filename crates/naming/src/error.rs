//! Naming Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A naming error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for naming operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Errors split into two groups. *Service-level* errors mean the naming
/// service cannot be used at all right now (see
/// [`is_service_level`](ErrorKind::is_service_level)); *item-level* errors
/// only concern the file that was being named.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No API key has been stored yet.
    #[display("no API key configured for the naming service")]
    MissingCredential,
    /// The service rejected the API key.
    #[display("the naming service rejected the API key")]
    Unauthorized,
    /// The service could not be reached, or answered with a server-side error.
    #[display("the naming service is unavailable")]
    Unavailable,
    /// The call did not finish within the configured timeout.
    #[display("the naming service did not answer in time")]
    Timeout,
    /// The service refused this particular request.
    #[display("the naming service rejected the request (HTTP {_0})")]
    Rejected(#[error(not(source))] u16),
    /// The service answered, but not with anything resembling a name.
    #[display("the naming service returned an unusable response")]
    InvalidResponse,
    /// The proposed name is empty once cleaned up.
    #[display("proposed name {_0:?} is not a usable file name")]
    InvalidName(#[error(not(source))] String),
    /// Unknown naming mode.
    #[display("invalid mode {_0:?}: expected \"text\" or \"image\"")]
    InvalidMode(#[error(not(source))] String),
    /// The HTTP client could not be constructed.
    #[display("could not initialise the HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if the error says nothing about the current item and
    /// everything about the service as a whole.
    pub fn is_service_level(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::Unauthorized | Self::Unavailable | Self::Timeout)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::MissingCredential, true)]
    #[case(ErrorKind::Unauthorized, true)]
    #[case(ErrorKind::Unavailable, true)]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::Rejected(400), false)]
    #[case(ErrorKind::InvalidResponse, false)]
    #[case(ErrorKind::InvalidName(String::new()), false)]
    fn test_service_level(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_service_level(), expected);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Rejected(422).to_string(), "the naming service rejected the request (HTTP 422)");
        assert_eq!(ErrorKind::InvalidMode("audio".into()).to_string(), "invalid mode \"audio\": expected \"text\" or \"image\"");
    }
}
