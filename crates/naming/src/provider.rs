use crate::credential::ApiKey;
use crate::error::Result;
use crate::mode::NamingMode;
use async_trait::async_trait;

/// Everything a provider gets to see about one file.
#[derive(Debug, Clone, Copy)]
pub struct NameRequest<'a> {
    pub original_name: &'a str,
    pub content: &'a [u8],
    pub mode: NamingMode,
}

/// The external naming collaborator.
///
/// One [`propose`](Self::propose) call is made per staged file. The engine
/// does not retry: a call either yields a name or an error, and the error's
/// [`is_service_level`](crate::error::ErrorKind::is_service_level) decides
/// whether it counts against the whole job or just the file.
#[async_trait]
pub trait NameProvider: Send + Sync {
    /// Name of the provider, used for logging only.
    fn name(&self) -> &str;

    /// Ask the service for a new name. The reply is returned as-is; run it
    /// through [`finalize_name`](crate::finalize_name) before using it.
    async fn propose(&self, request: NameRequest<'_>) -> Result<String>;

    /// Check that `api_key` is accepted by the service.
    async fn verify(&self, api_key: &ApiKey) -> Result<()>;
}
