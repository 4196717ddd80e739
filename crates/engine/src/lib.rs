//! Batch staging and the asynchronous rename job.
//!
//! A [`Session`] owns one [`StagingStore`] (the files uploaded so far) and
//! one [`RenameJob`] (the background worker that asks the naming service
//! for a new name per file). Progress is observed through [`Progress`]
//! snapshots, and a completed batch is packaged with [`Session::export`].

pub mod error;
mod export;
mod job;
mod progress;
mod session;
mod staging;

pub use crate::export::export;
pub use crate::job::{JobSettings, JobState, RenameJob, parse_mode};
pub use crate::progress::{Progress, poll};
pub use crate::session::Session;
pub use crate::staging::{FileEntry, StagingStore};
pub use renamer_naming::NamingMode;
