use super::service_account::ServiceAccountTokenSource;
use super::{AccessToken, AuthError, TokenSource};
use crate::config::FirestoreConfig;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

type PendingToken = Shared<BoxFuture<'static, Result<AccessToken, AuthError>>>;

/// Caching bearer token provider.
///
/// Cached tokens are served under a read lock. When no valid token is cached, the first
/// caller starts a refresh and parks it in a single pending slot; every caller that
/// arrives before it completes awaits that same refresh instead of starting its own.
/// Failures are not cached, the next call tries again.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct TokenProvider {
    inner: Arc<Inner>,
}

struct Inner {
    source: Box<dyn TokenSource>,
    cached: RwLock<Option<AccessToken>>,
    pending: Mutex<Option<PendingToken>>,
}

impl TokenProvider {
    pub fn new<S: TokenSource + 'static>(source: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Box::new(source),
                cached: RwLock::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    /// A provider signing service account assertions for `config`.
    pub fn from_config(config: &FirestoreConfig) -> Self {
        Self::new(ServiceAccountTokenSource::from_config(config))
    }

    /// The bearer string to put in the `Authorization` header.
    pub async fn token(&self) -> Result<String, AuthError> {
        self.access_token()
            .await
            .map(|token| token.as_str().to_string())
    }

    pub async fn access_token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let pending = {
            let mut slot = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // The refresh publishes to the cache before it frees the slot
            if let Some(token) = self.cached() {
                return Ok(token);
            }

            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.refresh();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Drops the cached token so the next call fetches a new one.
    pub fn invalidate(&self) {
        *self
            .inner
            .cached
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn cached(&self) -> Option<AccessToken> {
        self.inner
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.is_valid())
            .cloned()
    }

    fn refresh(&self) -> PendingToken {
        let inner = self.inner.clone();
        async move {
            debug!("fetching access token");
            let result = inner.source.fetch_token().await;

            match &result {
                Ok(token) => {
                    info!(expires_at = %token.expires_at(), "access token refreshed");
                    *inner.cached.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(token.clone());
                }
                Err(e) => warn!(error = %e, "access token refresh failed"),
            }

            inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            result
        }
        .boxed()
        .shared()
    }
}
