//! Rename a set of local files in one go, without the HTTP surface.

use crate::app::App;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use renamer_engine::{NamingMode, Progress, parse_mode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct BatchArgs {
    pub files: Vec<PathBuf>,
    pub mode: String,
    pub output: Option<PathBuf>,
}

/// Stage, rename and export, then clear the session whatever the outcome.
/// Returns where the archive was written.
#[instrument(skip_all, fields(files = args.files.len(), mode = %args.mode))]
pub async fn run(app: &App, args: BatchArgs) -> Result<PathBuf> {
    let mode = parse_mode(&args.mode).or_raise(|| ErrorKind::Batch("invalid mode".to_string()))?;
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let content = tokio::fs::read(path).await.or_raise(|| ErrorKind::Input(path.clone()))?;
        files.push((file_name(path), content));
    }

    let result = rename(app, files, mode, args.output).await;
    let removed = app.session.clear().await;
    debug!(removed, "staging cleared");
    result
}

async fn rename(app: &App, files: Vec<(String, Vec<u8>)>, mode: NamingMode, output: Option<PathBuf>) -> Result<PathBuf> {
    let session = &app.session;
    session.add_files(files).await.or_raise(|| ErrorKind::Storage)?;
    session.set_mode(mode).or_raise(|| ErrorKind::Batch("could not set mode".to_string()))?;
    session.start().await.or_raise(|| ErrorKind::Batch("job was not accepted".to_string()))?;

    let canceller = {
        let session = Arc::clone(session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping after the current file");
                session.cancel();
            }
        })
    };
    let mut last_current = None;
    let mut finished: Option<Progress> = None;
    let mut updates = std::pin::pin!(session.poll(app.config.poll_interval()));
    while let Some(progress) = updates.next().await {
        if last_current != Some(progress.current) {
            info!(current = progress.current, total = progress.total, "renaming");
            last_current = Some(progress.current);
        }
        finished = Some(progress);
    }
    canceller.abort();

    let progress = finished.ok_or_else(|| exn::Exn::from(ErrorKind::Batch("no progress reported".to_string())))?;
    if !progress.is_completed() {
        let reason = progress.error.unwrap_or_else(|| progress.state.to_string());
        exn::bail!(ErrorKind::Batch(reason));
    }
    for entry in session.files().await {
        let marker = if entry.failed { " (kept)" } else { "" };
        println!("{} -> {}{marker}", entry.original_name, entry.export_name());
    }

    let archive = session.export().await.or_raise(|| ErrorKind::Batch("export failed".to_string()))?;
    let output =
        output.unwrap_or_else(|| PathBuf::from(session.archive_format().file_name(&app.config.archive.filename)));
    tokio::fs::write(&output, &archive).await.or_raise(|| ErrorKind::Output(output.clone()))?;
    info!(path = %output.display(), bytes = archive.len(), "archive written");
    Ok(output)
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
