//! The ordered set of files waiting to be renamed.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use renamer_storage::BackendHandle;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// One staged file.
///
/// `index` is 1-based and never changes while the file is staged.
/// `renamed_name` stays `None` until a job over this entry completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub index: usize,
    pub original_name: String,
    pub renamed_name: Option<String>,
    /// The naming service failed for this entry and `renamed_name` is the
    /// original name reused as a placeholder.
    pub failed: bool,
    pub size: u64,
}

impl FileEntry {
    /// The name the file is exported under.
    pub fn export_name(&self) -> &str {
        self.renamed_name.as_deref().unwrap_or(&self.original_name)
    }
}

/// A name produced by a job for one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProducedName {
    pub(crate) name: String,
    pub(crate) failed: bool,
}

/// Staged file metadata plus the backend holding their content.
///
/// Content lives in the [`StorageBackend`](renamer_storage::StorageBackend)
/// under a key derived from the entry index; metadata lives here.
pub struct StagingStore {
    backend: BackendHandle,
    entries: RwLock<Vec<FileEntry>>,
}

fn content_key(index: usize) -> PathBuf {
    PathBuf::from(format!("{index:06}"))
}

/// Browsers may send a relative path for folder uploads; keep the last part.
fn display_name(raw: &str, index: usize) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() { format!("file-{index}") } else { name.to_string() }
}

impl StagingStore {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend, entries: RwLock::new(Vec::new()) }
    }

    /// Append files, keeping existing entries and their indices.
    ///
    /// Returns the original names of *all* staged files, in order. If any
    /// write fails the content already written by this call is removed and
    /// no entry is added.
    #[instrument(skip_all, fields(backend = self.backend.name(), added))]
    pub async fn add_files(&self, files: impl IntoIterator<Item = (String, Vec<u8>)>) -> Result<Vec<String>> {
        let mut entries = self.entries.write().await;
        let next = entries.last().map_or(1, |entry| entry.index + 1);
        let mut added: Vec<FileEntry> = Vec::new();
        for (offset, (name, content)) in files.into_iter().enumerate() {
            let index = next + offset;
            if let Err(err) = self.backend.write(&content_key(index), &content).await {
                for entry in &added {
                    if let Err(cleanup) = self.backend.delete(&content_key(entry.index)).await {
                        warn!(index = entry.index, error = %*cleanup, "could not remove partially staged content");
                    }
                }
                return Err(err).or_raise(|| ErrorKind::Storage);
            }
            added.push(FileEntry {
                index,
                original_name: display_name(&name, index),
                renamed_name: None,
                failed: false,
                size: content.len() as u64,
            });
        }
        tracing::Span::current().record("added", added.len());
        debug!("staged files");
        entries.extend(added);
        Ok(entries.iter().map(|entry| entry.original_name.clone()).collect())
    }

    /// Snapshot of every staged entry, in index order.
    pub async fn list(&self) -> Vec<FileEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Content of the entry with the given index.
    pub async fn content(&self, index: usize) -> Result<Vec<u8>> {
        self.backend.read(&content_key(index)).await.or_raise(|| ErrorKind::Storage)
    }

    /// Forget every rename result, ahead of a new job.
    pub(crate) async fn reset_renamed(&self) {
        for entry in self.entries.write().await.iter_mut() {
            entry.renamed_name = None;
            entry.failed = false;
        }
    }

    /// Write job results onto the leading entries, one name per entry in
    /// index order. Entries staged after the job started are left alone.
    pub(crate) async fn merge_renamed(&self, names: Vec<ProducedName>) {
        let mut entries = self.entries.write().await;
        for (entry, produced) in entries.iter_mut().zip(names) {
            entry.renamed_name = Some(produced.name);
            entry.failed = produced.failed;
        }
    }

    /// Remove every staged entry and its content. Never fails: content the
    /// backend cannot delete is logged and left behind.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        match self.backend.clear().await {
            Ok(deleted) => debug!(removed, deleted, "staging cleared"),
            Err(err) => warn!(removed, error = %*err, "staging cleared, but stored content could not be removed"),
        }
        removed
    }
}
