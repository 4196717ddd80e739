use super::{JobSettings, JobState, Shared, lock};
use crate::staging::{FileEntry, ProducedName, StagingStore};
use renamer_naming::error::{ErrorKind as NamingErrorKind, Result as NamingResult};
use renamer_naming::{NameRequest, NamingMode, ProviderHandle, finalize_name};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

enum Outcome {
    Completed,
    Stopped,
    Failed(String),
}

pub(super) struct Worker {
    pub(super) provider: ProviderHandle,
    pub(super) staging: Arc<StagingStore>,
    pub(super) shared: Arc<Mutex<Shared>>,
    pub(super) finished: Arc<Notify>,
    pub(super) settings: JobSettings,
    pub(super) mode: NamingMode,
    pub(super) entries: Vec<FileEntry>,
    pub(super) cancel: CancellationToken,
}

impl Worker {
    #[instrument(name = "rename_job", skip_all, fields(total = self.entries.len(), mode = %self.mode))]
    pub(super) async fn run(self) {
        let outcome = self.process().await;
        self.finish(outcome).await;
    }

    async fn process(&self) -> Outcome {
        let total = self.entries.len();
        let fatal_after = self.settings.fatal_after.clamp(1, total.max(1));
        let mut consecutive = 0;
        for entry in &self.entries {
            if self.cancel.is_cancelled() {
                return Outcome::Stopped;
            }
            let content = match self.staging.content(entry.index).await {
                Ok(content) => content,
                Err(err) => {
                    error!(index = entry.index, error = ?err, "staged content is unreadable");
                    return Outcome::Failed(format!("could not read staged file {:?}", entry.original_name));
                },
            };
            let produced = match self.name_one(entry, &content).await {
                Ok(name) => {
                    consecutive = 0;
                    debug!(index = entry.index, from = %entry.original_name, to = %name, "renamed");
                    ProducedName { name, failed: false }
                },
                Err(err) => {
                    if err.is_service_level() {
                        consecutive += 1;
                    } else {
                        consecutive = 0;
                    }
                    warn!(index = entry.index, file = %entry.original_name, error = %*err, "keeping original name");
                    if consecutive >= fatal_after {
                        return Outcome::Failed(format!("{}; giving up after {consecutive} consecutive failures", *err));
                    }
                    ProducedName { name: entry.original_name.clone(), failed: true }
                },
            };
            let mut shared = lock(&self.shared);
            if produced.failed {
                shared.failures.push(entry.index);
            }
            shared.names.push(produced);
            shared.current += 1;
        }
        // A cancel that arrived while the last item was in flight still wins.
        let mut shared = lock(&self.shared);
        if self.cancel.is_cancelled() {
            return Outcome::Stopped;
        }
        shared.finishing = true;
        Outcome::Completed
    }

    async fn name_one(&self, entry: &FileEntry, content: &[u8]) -> NamingResult<String> {
        let request = NameRequest { original_name: &entry.original_name, content, mode: self.mode };
        let proposal = match tokio::time::timeout(self.settings.timeout, self.provider.propose(request)).await {
            Ok(result) => result?,
            Err(_elapsed) => exn::bail!(NamingErrorKind::Timeout),
        };
        finalize_name(&proposal, &entry.original_name)
    }

    async fn finish(self, outcome: Outcome) {
        self.publish(outcome).await;
        self.finished.notify_waiters();
    }

    async fn publish(&self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => {
                let names = lock(&self.shared).names.clone();
                // Merge before publishing, so Completed always comes with names.
                self.staging.merge_renamed(names).await;
                let mut shared = lock(&self.shared);
                shared.state = JobState::Completed;
                info!(failures = shared.failures.len(), "rename job completed");
            },
            Outcome::Stopped => {
                let mut shared = lock(&self.shared);
                shared.state = JobState::Stopped;
                shared.names.clear();
                info!(current = shared.current, "rename job stopped");
            },
            Outcome::Failed(message) => {
                let mut shared = lock(&self.shared);
                shared.state = JobState::Failed;
                shared.names.clear();
                error!(current = shared.current, error = %message, "rename job failed");
                shared.error = Some(message);
            },
        }
    }
}
