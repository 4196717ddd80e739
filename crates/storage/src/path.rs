//! Key validation.
//!
//! Every key handed to a backend goes through [`validate`] first so that a
//! backend rooted on disk can never be tricked into touching files outside of
//! its own directory.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage key and returns its normalized form.
///
/// `.` segments and repeated separators are dropped, `..` segments are
/// resolved, and anything that would climb above the storage root is
/// rejected with [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
/// Null bytes and Windows drive prefixes are rejected too.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use renamer_storage::validate_path;
///
/// assert!(validate_path("000001").is_ok());
/// assert!(validate_path("batch/000002").is_ok());
/// assert!(validate_path("../000001").is_err());
/// assert_eq!(validate_path("./batch//000003/").unwrap(), Path::new("batch/000003"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // paths in syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
    }
    Ok(components.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("000001", "000001")]
    #[case("batch/000001", "batch/000001")]
    #[case("batch//000001", "batch/000001")]
    #[case("./batch/./000001", "batch/000001")]
    #[case("/000001", "000001")]
    #[case("batch/../000001", "000001")]
    #[case("batch/000001///", "batch/000001")]
    fn test_valid_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(validate(key).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("..")]
    #[case("../000001")]
    #[case("batch/../../000001")]
    #[case("bad\0key")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate(key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
