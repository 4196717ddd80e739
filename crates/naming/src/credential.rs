//! Process-wide API key for the naming service.

use crate::error::Result;
use crate::provider::NameProvider;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, instrument, warn};

pub type CredentialHandle = Arc<CredentialStore>;

/// An API key. The [`Debug`] output never contains the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// The raw key, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The predicate the rename engine consults before accepting a job.
pub trait CredentialGate: Send + Sync {
    /// `true` once a key has been stored *and* accepted by the service.
    fn is_configured(&self) -> bool;
}

/// Holds at most one validated API key.
///
/// Only keys that went through [`verify_and_store`] (or were explicitly
/// stored as validated) are kept, so presence implies validity.
#[derive(Default)]
pub struct CredentialStore {
    key: RwLock<Option<ApiKey>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a key that has already been accepted by the service.
    pub fn store_validated(&self, key: ApiKey) {
        // A poisoned lock only means a writer panicked mid-assignment of an
        // `Option`; the value is still coherent.
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn api_key(&self) -> Option<ApiKey> {
        self.key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn has_key(&self) -> bool {
        self.key.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn forget(&self) {
        self.key.write().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Debug for CredentialStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CredentialStore").field("has_key", &self.has_key()).finish()
    }
}

impl CredentialGate for CredentialStore {
    fn is_configured(&self) -> bool {
        self.has_key()
    }
}

/// Check `key` against the service and keep it if accepted.
///
/// A rejected key leaves any previously stored key in place.
#[instrument(skip_all, fields(provider = provider.name()))]
pub async fn verify_and_store(provider: &dyn NameProvider, store: &CredentialStore, key: ApiKey) -> Result<()> {
    match provider.verify(&key).await {
        Ok(()) => {
            store.store_validated(key);
            info!("API key accepted");
            Ok(())
        },
        Err(err) => {
            warn!(error = %*err, "API key rejected");
            Err(err)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::NameRequest;
    use async_trait::async_trait;

    struct FixedKeyProvider(&'static str);

    #[async_trait]
    impl NameProvider for FixedKeyProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn propose(&self, request: NameRequest<'_>) -> Result<String> {
            Ok(request.original_name.to_string())
        }

        async fn verify(&self, api_key: &ApiKey) -> Result<()> {
            if api_key.expose() == self.0 {
                Ok(())
            } else {
                exn::bail!(ErrorKind::Unauthorized)
            }
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = ApiKey::new("sk-very-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(<redacted>)");
        let store = CredentialStore::new();
        store.store_validated(key);
        assert!(!format!("{store:?}").contains("sk-very-secret"));
    }

    #[test]
    fn test_store_and_forget() {
        let store = CredentialStore::new();
        assert!(!store.is_configured());
        store.store_validated(ApiKey::new("  sk-1  "));
        assert!(store.is_configured());
        assert_eq!(store.api_key().unwrap().expose(), "sk-1");
        store.forget();
        assert!(!store.has_key());
        assert!(store.api_key().is_none());
    }

    #[tokio::test]
    async fn test_verify_and_store() {
        let provider = FixedKeyProvider("sk-good");
        let store = CredentialStore::new();

        let err = verify_and_store(&provider, &store, ApiKey::new("sk-bad")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unauthorized);
        assert!(!store.is_configured());

        verify_and_store(&provider, &store, ApiKey::new("sk-good")).await.unwrap();
        assert!(store.is_configured());

        // A later rejected key does not evict the good one.
        verify_and_store(&provider, &store, ApiKey::new("sk-worse")).await.unwrap_err();
        assert_eq!(store.api_key().unwrap().expose(), "sk-good");
    }
}
