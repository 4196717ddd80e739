//! Storage models.

use std::path::PathBuf;
use time::OffsetDateTime;

/// Metadata for one piece of stored content, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Key relative to the storage root
    pub path: PathBuf,
    /// Content size in bytes
    pub size: u64,
    /// When the content was last written
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }
}
