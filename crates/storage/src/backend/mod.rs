//! Storage backend trait and implementations.
//!
//! This module defines the [`StorageBackend`] trait, a small async CRUD
//! interface over keyed blobs, and the two implementations used for staging.

mod local;
mod memory;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
pub use self::memory::MemoryBackend;
#[cfg(feature = "mock")]
pub use self::mock::FaultyBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for staged-content storage.
///
/// All keys are relative to the backend's root and are validated with
/// [`validate_path`](crate::validate_path) by implementations before use.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use renamer_storage::backend::{MemoryBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::default();
/// backend.write(Path::new("000001"), b"quarterly numbers").await.map_err(|e| e.to_string())?;
/// let data = backend.read(Path::new("000001")).await.map_err(|e| e.to_string())?;
/// assert_eq!(data, b"quarterly numbers");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List all stored content.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for all stored content, yielding entries as they are
    /// discovered. Ordering is backend-specific.
    fn list_stream<'a>(&'a self) -> FileInfoStream<'a>;

    /// Read content. Returns [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if nothing is stored under `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write content, replacing anything already stored under `path`.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete content. Returns [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if nothing is stored under `path`.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Delete everything this backend holds.
    ///
    /// The default implementation lists then deletes one key at a time;
    /// content that disappears in between is ignored. Returns the number of
    /// entries removed.
    async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for info in self.list().await? {
            match self.delete(&info.path).await {
                Ok(()) => removed += 1,
                Err(e) if matches!(&*e, crate::error::ErrorKind::NotFound(_)) => {},
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}
