use crate::job::{JobState, RenameJob};
use async_stream::stream;
use futures::Stream;
use renamer_naming::NamingMode;
use serde::Serialize;
use std::time::Duration;

/// A snapshot of a rename job, as returned by
/// [`RenameJob::status`](crate::RenameJob::status).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub state: JobState,
    pub mode: NamingMode,
    /// Items finished so far; never exceeds `total`.
    pub current: usize,
    /// Number of files staged when the job started.
    pub total: usize,
    /// The produced names in index order. Only present once completed.
    pub files: Option<Vec<String>>,
    /// 1-based indices of entries that kept their original name because the
    /// naming service failed for them.
    pub failures: Vec<usize>,
    /// Why the job failed, if it did.
    pub error: Option<String>,
}

impl Progress {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn is_stopped(&self) -> bool {
        self.state == JobState::Stopped
    }

    pub fn is_failed(&self) -> bool {
        self.state == JobState::Failed
    }
}

/// Poll `job` every `interval`, yielding each snapshot.
///
/// The stream ends after the first terminal snapshot, or immediately after
/// one snapshot if no job was ever started.
pub fn poll(job: &RenameJob, interval: Duration) -> impl Stream<Item = Progress> + '_ {
    stream!({
        loop {
            let progress = job.status();
            let done = progress.is_terminal() || progress.state == JobState::Idle;
            yield progress;
            if done {
                break;
            }
            tokio::time::sleep(interval).await;
        }
    })
}
