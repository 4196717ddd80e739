use crate::error::{ErrorKind, Result};
use crate::server::AppState;
use exn::ResultExt;
use renamer_config::Config;
use renamer_engine::{JobSettings, RenameJob, Session, StagingStore};
use renamer_naming::error::Result as NamingResult;
use renamer_naming::{ApiKey, CredentialHandle, CredentialStore, OpenAiProvider, ProviderHandle, verify_and_store};
use renamer_storage::BackendHandle;
use renamer_storage::backend::{LocalBackend, MemoryBackend};
use std::sync::Arc;
use tracing::{info, instrument};

/// Every long-lived component, wired from configuration.
pub struct App {
    pub config: Config,
    pub credentials: CredentialHandle,
    pub provider: ProviderHandle,
    pub session: Arc<Session>,
}

impl App {
    #[instrument(skip_all)]
    pub async fn build(config: Config) -> Result<Self> {
        let backend: BackendHandle = match &config.staging.directory {
            Some(directory) => {
                Arc::new(LocalBackend::new("staging", directory).or_raise(|| ErrorKind::Storage)?)
            },
            None => Arc::new(MemoryBackend::default().with_name("staging")),
        };
        info!(backend = backend.name(), "staging storage ready");

        let credentials: CredentialHandle = Arc::new(CredentialStore::new());
        let provider: ProviderHandle = Arc::new(
            OpenAiProvider::new(
                &config.naming.base_url,
                &config.naming.model,
                Arc::clone(&credentials),
                config.naming.max_content_bytes,
            )
            .or_raise(|| ErrorKind::Naming)?,
        );
        let app = Self::assemble(config, backend, credentials, provider);
        if app.config.staging.directory.is_some() {
            // Staging never outlives the process; drop leftovers from a previous run.
            app.session.clear().await;
        }
        Ok(app)
    }

    /// Wire the session around already-built collaborators.
    pub fn assemble(
        config: Config,
        backend: BackendHandle,
        credentials: CredentialHandle,
        provider: ProviderHandle,
    ) -> Self {
        let settings = JobSettings { timeout: config.naming_timeout(), fatal_after: config.job.fatal_after };
        let job = RenameJob::new(Arc::clone(&provider), credentials.clone(), settings);
        let session = Arc::new(Session::new(StagingStore::new(backend), job, config.archive.format));
        Self { config, credentials, provider, session }
    }

    /// Validate and store the API key from configuration, if one is set.
    /// Returns whether a key was configured.
    pub async fn seed_api_key(&self) -> NamingResult<bool> {
        let Some(key) = self.config.api_key() else {
            return Ok(false);
        };
        verify_and_store(self.provider.as_ref(), &self.credentials, ApiKey::new(key)).await?;
        Ok(true)
    }

    pub fn state(&self) -> AppState {
        AppState {
            session: Arc::clone(&self.session),
            credentials: Arc::clone(&self.credentials),
            provider: Arc::clone(&self.provider),
            archive_name: self.config.archive.format.file_name(&self.config.archive.filename),
            poll_interval_ms: self.config.job.poll_interval_ms,
        }
    }
}
