use crate::error::{ErrorKind, Result};
use crate::job::{JobState, RenameJob};
use crate::staging::StagingStore;
use exn::ResultExt;
use renamer_archive::{ArchiveFormat, unique_names};
use tracing::{info, instrument};

/// Package every staged file under its renamed name.
///
/// Requires the job's last terminal state to be
/// [`Completed`](JobState::Completed) and at least one entry to carry a
/// renamed name; otherwise fails with
/// [`NothingToExport`](ErrorKind::NothingToExport). Entries staged after
/// the job started are included under their original names. Names that
/// collide are disambiguated, order is preserved.
#[instrument(skip_all, fields(format = %format))]
pub async fn export(job: &RenameJob, staging: &StagingStore, format: ArchiveFormat) -> Result<Vec<u8>> {
    if job.state() != JobState::Completed {
        exn::bail!(ErrorKind::NothingToExport);
    }
    let entries = staging.list().await;
    if entries.iter().all(|entry| entry.renamed_name.is_none()) {
        exn::bail!(ErrorKind::NothingToExport);
    }

    let names = unique_names(entries.iter().map(|entry| entry.export_name()));
    let mut pairs = Vec::with_capacity(entries.len());
    for (entry, name) in entries.iter().zip(names) {
        pairs.push((name, staging.content(entry.index).await?));
    }
    let archive = format.build(pairs).or_raise(|| ErrorKind::Archive)?;
    info!(files = entries.len(), bytes = archive.len(), "archive built");
    Ok(archive)
}
