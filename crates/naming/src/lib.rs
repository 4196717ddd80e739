//! External naming service.
//!
//! Everything the rename engine needs from "the outside world" lives here:
//!
//! - [`NameProvider`], the seam the engine calls once per staged file, and
//!   [`OpenAiProvider`], its implementation against an OpenAI-compatible
//!   chat completions API.
//! - [`CredentialStore`], the process-wide API key that gates job start
//!   through the [`CredentialGate`] predicate.
//! - [`finalize_name`], which turns whatever the service replied with into
//!   something that is safe to use as a file name.

mod credential;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod mode;
mod openai;
mod provider;
mod sanitize;

pub use crate::credential::{ApiKey, CredentialGate, CredentialHandle, CredentialStore, verify_and_store};
#[cfg(feature = "mock")]
pub use crate::mock::ScriptedProvider;
pub use crate::mode::NamingMode;
pub use crate::openai::OpenAiProvider;
pub use crate::provider::{NameProvider, NameRequest};
pub use crate::sanitize::finalize_name;
use std::sync::Arc;

pub type ProviderHandle = Arc<dyn NameProvider + Send + Sync>;
