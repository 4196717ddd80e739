use crate::error::Result;
use crate::export::export;
use crate::job::{JobState, RenameJob};
use crate::progress::{Progress, poll};
use crate::staging::{FileEntry, StagingStore};
use futures::Stream;
use renamer_archive::ArchiveFormat;
use renamer_naming::NamingMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// One user's staging area and rename job.
///
/// The session is the only place where the store and the job meet, and it
/// serialises the operations that must not interleave: starting a job,
/// clearing, and exporting.
///
/// ```no_run
/// # async fn example(session: renamer_engine::Session) -> renamer_engine::error::Result<()> {
/// session.add_files([("a.txt".to_string(), b"alpha".to_vec())]).await?;
/// session.start().await?;
/// // ...poll session.status() until it is terminal...
/// let archive = session.export().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    staging: Arc<StagingStore>,
    job: RenameJob,
    format: ArchiveFormat,
    control: Mutex<()>,
}

impl Session {
    pub fn new(staging: StagingStore, job: RenameJob, format: ArchiveFormat) -> Self {
        Self { staging: Arc::new(staging), job, format, control: Mutex::new(()) }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        self.format
    }

    /// Stage more files. Allowed while a job runs; the running job only
    /// covers what was staged when it started.
    pub async fn add_files(&self, files: impl IntoIterator<Item = (String, Vec<u8>)>) -> Result<Vec<String>> {
        self.staging.add_files(files).await
    }

    pub async fn files(&self) -> Vec<FileEntry> {
        self.staging.list().await
    }

    pub fn set_mode(&self, mode: NamingMode) -> Result<()> {
        self.job.set_mode(mode)
    }

    pub async fn start(&self) -> Result<()> {
        let _guard = self.control.lock().await;
        self.job.start(&self.staging).await
    }

    pub fn status(&self) -> Progress {
        self.job.status()
    }

    /// Observe the job until it reaches a terminal state.
    pub fn poll(&self, interval: Duration) -> impl Stream<Item = Progress> + '_ {
        poll(&self.job, interval)
    }

    pub fn cancel(&self) -> bool {
        self.job.cancel()
    }

    /// Stop any running job, wait for it to settle, then drop every staged
    /// file and the job itself. Returns the number of entries removed.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> usize {
        let _guard = self.control.lock().await;
        let cancelled = self.job.cancel();
        let state = self.job.wait().await;
        if cancelled {
            info!(%state, "running job settled before clear");
        }
        // The job is no longer running and no start() can get in while the
        // control lock is held.
        if let Err(err) = self.job.reset() {
            warn!(error = %*err, "could not reset the rename job");
        }
        self.staging.clear().await
    }

    /// Wait for the current job's worker to finish, if there is one.
    pub async fn wait(&self) -> JobState {
        self.job.wait().await
    }

    pub async fn export(&self) -> Result<Vec<u8>> {
        let _guard = self.control.lock().await;
        export(&self.job, &self.staging, self.format).await
    }
}
