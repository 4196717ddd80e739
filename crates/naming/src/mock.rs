//! Scripted naming provider for tests in dependent crates.

use crate::credential::ApiKey;
use crate::error::{ErrorKind, Result};
use crate::provider::{NameProvider, NameRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;

type ProposeFn = dyn Fn(&NameRequest<'_>) -> Result<String> + Send + Sync;

/// A [`NameProvider`] whose answers are decided by the test.
///
/// By default every file is renamed to its upper-cased stem with the
/// original extension (`a.txt` becomes `A.txt`).
pub struct ScriptedProvider {
    propose: Box<ProposeFn>,
    failures: Mutex<HashMap<String, ErrorKind>>,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    valid_key: Option<String>,
    calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new(|request| Ok(upper_stem(request.original_name)))
    }
}

impl ScriptedProvider {
    pub fn new(propose: impl Fn(&NameRequest<'_>) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            propose: Box::new(propose),
            failures: Mutex::new(HashMap::new()),
            gate: None,
            delay: None,
            valid_key: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that fails every call with `kind`.
    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(move |_| Err(exn::Exn::from(kind.clone())))
    }

    /// Fail the call for `original_name` with `kind`.
    pub fn fail_on(self, original_name: impl Into<String>, kind: ErrorKind) -> Self {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).insert(original_name.into(), kind);
        self
    }

    /// Every call first acquires (and consumes) one permit from `gate`, so a
    /// test can hold the worker in the middle of an item.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Only this key passes [`verify`](NameProvider::verify); without it,
    /// every non-empty key does.
    pub fn accepting(mut self, key: impl Into<String>) -> Self {
        self.valid_key = Some(key.into());
        self
    }

    /// Number of `propose` calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn upper_stem(original_name: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{}.{extension}", stem.to_uppercase()),
        _ => original_name.to_uppercase(),
    }
}

#[async_trait]
impl NameProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, request: NameRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| exn::Exn::from(ErrorKind::Unavailable))?.forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap_or_else(PoisonError::into_inner).get(request.original_name).cloned();
        if let Some(kind) = failure {
            exn::bail!(kind);
        }
        (self.propose)(&request)
    }

    async fn verify(&self, api_key: &ApiKey) -> Result<()> {
        let accepted = match &self.valid_key {
            Some(valid) => api_key.expose() == valid,
            None => !api_key.is_empty(),
        };
        if !accepted {
            exn::bail!(ErrorKind::Unauthorized);
        }
        Ok(())
    }
}
