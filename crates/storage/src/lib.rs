//! Content storage for staged files.
//!
//! Staged uploads keep their bytes behind a [`StorageBackend`] so the staging
//! store only has to track names and indices. Two backends are provided:
//! [`MemoryBackend`](backend::MemoryBackend) (the default, nothing survives a
//! restart) and [`LocalBackend`](backend::LocalBackend) which spills content
//! into a directory for batches that don't fit comfortably in memory.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
