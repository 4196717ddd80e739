//! Storage backend with injectable faults, for testing.

use super::{FileInfoStream, MemoryBackend};
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A [`MemoryBackend`] that can be told to fail.
///
/// Writes start failing once the write budget is spent, and reads of
/// selected keys always fail. Everything else is passed through.
pub struct FaultyBackend {
    inner: MemoryBackend,
    writes_left: AtomicUsize,
    unreadable: Mutex<HashSet<PathBuf>>,
}

impl Default for FaultyBackend {
    fn default() -> Self {
        Self {
            inner: MemoryBackend::default().with_name("faulty"),
            writes_left: AtomicUsize::new(usize::MAX),
            unreadable: Mutex::default(),
        }
    }
}

impl FaultyBackend {
    /// Allow `n` more successful writes; every write after that fails.
    pub fn fail_writes_after(self, n: usize) -> Self {
        self.writes_left.store(n, Ordering::SeqCst);
        self
    }

    /// Make every read of `path` fail.
    pub fn fail_reads_of(self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.lock().unwrap_or_else(PoisonError::into_inner).insert(path.into());
        self
    }

    fn injected(path: &Path) -> exn::Exn<ErrorKind> {
        exn::Exn::from(ErrorKind::BackendError(format!("injected fault for `{}`", path.display())))
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self) -> FileInfoStream<'a> {
        self.inner.list_stream()
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if self.unreadable.lock().unwrap_or_else(PoisonError::into_inner).contains(path) {
            return Err(Self::injected(path));
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let allowed = self.writes_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if !allowed {
            return Err(Self::injected(path));
        }
        self.inner.write(path, data).await
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn clear(&self) -> Result<usize> {
        self.inner.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_budget() {
        let backend = FaultyBackend::default().fail_writes_after(1);
        backend.write(Path::new("000001"), b"a").await.unwrap();
        let err = backend.write(Path::new("000002"), b"b").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        assert_eq!(backend.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable() {
        let backend = FaultyBackend::default().fail_reads_of("000002");
        backend.write(Path::new("000001"), b"a").await.unwrap();
        backend.write(Path::new("000002"), b"b").await.unwrap();
        assert_eq!(backend.read(Path::new("000001")).await.unwrap(), b"a");
        assert!(backend.read(Path::new("000002")).await.is_err());
    }
}
