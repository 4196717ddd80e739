//! The rename job state machine.
//!
//! ```text
//!        start()            all items done
//! Idle ──────────► Running ───────────────► Completed
//!                    │ │
//!          cancel()  │ │  service unavailable / storage fault
//!                    ▼ ▼
//!              Stopped  Failed
//! ```
//!
//! Terminal states only leave through another `start()` (or `reset()`).

mod worker;

use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use crate::staging::{ProducedName, StagingStore};
use derive_more::Display;
use exn::ResultExt;
use renamer_naming::{CredentialGate, NamingMode, ProviderHandle};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    #[display("idle")]
    Idle,
    #[display("running")]
    Running,
    #[display("completed")]
    Completed,
    #[display("stopped")]
    Stopped,
    #[display("failed")]
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }
}

/// Tunables for the worker.
#[derive(Clone, Debug)]
pub struct JobSettings {
    /// Upper bound for a single naming call.
    pub timeout: Duration,
    /// Consecutive service-level failures (unreachable, unauthorized, timed
    /// out) after which the job gives up. Capped at the job's total.
    pub fatal_after: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(60), fatal_after: 3 }
    }
}

/// Parse a mode name, as sent by clients.
pub fn parse_mode(value: &str) -> Result<NamingMode> {
    value.parse::<NamingMode>().or_raise(|| ErrorKind::InvalidMode(value.to_string()))
}

/// Everything `status()` reads. Kept behind one mutex so a reader never
/// sees `current` and `names` disagree.
#[derive(Default)]
struct Shared {
    state: JobState,
    mode: NamingMode,
    current: usize,
    total: usize,
    names: Vec<ProducedName>,
    failures: Vec<usize>,
    error: Option<String>,
    cancel: CancellationToken,
    /// Every item is done and results are being merged; too late to cancel.
    finishing: bool,
}

/// Single-flight, cancellable batch rename.
///
/// [`start`](Self::start) returns as soon as the job is accepted; the work
/// happens on a spawned Tokio task that processes staged entries one at a
/// time, in index order.
pub struct RenameJob {
    provider: ProviderHandle,
    gate: Arc<dyn CredentialGate>,
    settings: JobSettings,
    shared: Arc<Mutex<Shared>>,
    finished: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenameJob {
    pub fn new(provider: ProviderHandle, gate: Arc<dyn CredentialGate>, settings: JobSettings) -> Self {
        Self { provider, gate, settings, shared: Arc::default(), finished: Arc::default(), handle: Mutex::default() }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }

    /// Choose the mode for the next job.
    ///
    /// Fails with [`InvalidState`](ErrorKind::InvalidState) while a job is
    /// running; the running job keeps the mode it started with.
    pub fn set_mode(&self, mode: NamingMode) -> Result<()> {
        let mut shared = self.shared();
        if shared.state == JobState::Running {
            exn::bail!(ErrorKind::InvalidState("change mode"));
        }
        shared.mode = mode;
        info!(%mode, "naming mode set");
        Ok(())
    }

    /// Accept a new job over everything currently staged.
    ///
    /// Checks, in order: something is staged, no job is running, the
    /// naming service has a credential. Must be called from within a Tokio
    /// runtime.
    #[instrument(skip_all, fields(total))]
    pub async fn start(&self, staging: &Arc<StagingStore>) -> Result<()> {
        let entries = staging.list().await;
        if entries.is_empty() {
            exn::bail!(ErrorKind::NoFilesStaged);
        }
        self.check_startable()?;
        // Results of the previous job must be gone before Running is visible.
        staging.reset_renamed().await;

        let mut shared = self.shared();
        // Another start() may have won the race while the lock was released.
        if shared.state == JobState::Running {
            exn::bail!(ErrorKind::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let total = entries.len();
        tracing::Span::current().record("total", total);
        *shared = Shared {
            state: JobState::Running,
            mode: shared.mode,
            current: 0,
            total,
            names: Vec::with_capacity(total),
            failures: Vec::new(),
            error: None,
            cancel: cancel.clone(),
            finishing: false,
        };
        let worker = worker::Worker {
            provider: Arc::clone(&self.provider),
            staging: Arc::clone(staging),
            shared: Arc::clone(&self.shared),
            finished: Arc::clone(&self.finished),
            settings: self.settings.clone(),
            mode: shared.mode,
            entries,
            cancel,
        };
        // Spawn while still holding the lock, so nobody can observe Running
        // without a handle to wait on.
        *lock(&self.handle) = Some(tokio::spawn(worker.run()));
        info!(mode = %shared.mode, "rename job accepted");
        Ok(())
    }

    fn check_startable(&self) -> Result<()> {
        if self.shared().state == JobState::Running {
            exn::bail!(ErrorKind::AlreadyRunning);
        }
        if !self.gate.is_configured() {
            exn::bail!(ErrorKind::MissingCredential);
        }
        Ok(())
    }

    /// Point-in-time view of the job. Never blocks on the worker.
    pub fn status(&self) -> Progress {
        let shared = self.shared();
        Progress {
            state: shared.state,
            mode: shared.mode,
            current: shared.current,
            total: shared.total,
            files: (shared.state == JobState::Completed)
                .then(|| shared.names.iter().map(|produced| produced.name.clone()).collect()),
            failures: shared.failures.clone(),
            error: shared.error.clone(),
        }
    }

    pub fn state(&self) -> JobState {
        self.shared().state
    }

    /// Ask a running job to stop. An item already in flight is allowed to
    /// finish, but the job still ends [`Stopped`](JobState::Stopped) with no
    /// names written.
    ///
    /// Returns whether a running job was signalled. Once the last item is
    /// done and results are being merged, this returns `false`.
    pub fn cancel(&self) -> bool {
        let shared = self.shared();
        if shared.state != JobState::Running || shared.finishing {
            return false;
        }
        shared.cancel.cancel();
        info!(current = shared.current, total = shared.total, "cancellation requested");
        true
    }

    /// Wait until no job is running. Safe to call from several tasks at
    /// once, and returns immediately when idle or terminal.
    pub async fn wait(&self) -> JobState {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle
            && let Err(join_error) = handle.await
        {
            error!(error = %join_error, "rename worker aborted");
            let mut shared = self.shared();
            if shared.state == JobState::Running {
                shared.state = JobState::Failed;
                shared.error = Some("the rename worker stopped unexpectedly".to_string());
                shared.names.clear();
            }
            drop(shared);
            self.finished.notify_waiters();
        }
        loop {
            // Register before checking, so a notification in between is not lost.
            let notified = self.finished.notified();
            let state = self.state();
            if state != JobState::Running {
                return state;
            }
            notified.await;
        }
    }

    /// Go back to [`Idle`](JobState::Idle), dropping counters and results.
    /// The mode is kept.
    pub fn reset(&self) -> Result<()> {
        let mut shared = self.shared();
        if shared.state == JobState::Running {
            exn::bail!(ErrorKind::InvalidState("reset the job"));
        }
        *shared = Shared { mode: shared.mode, ..Shared::default() };
        Ok(())
    }
}

/// Job state stays consistent across a panicking holder: every update to
/// `Shared` is a plain field assignment.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
