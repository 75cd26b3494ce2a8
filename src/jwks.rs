use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AuthError;

// 1. KeySetProvider Contract
/// KeySetProvider
///
/// The identity-provider capability consumed by the token verifier: produce
/// the issuer's currently published signing keys. Swapping the implementation
/// lets tests verify real signatures without network access.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError>;
}

/// KeySetState
///
/// The shared handle stored in the application state.
pub type KeySetState = Arc<dyn KeySetProvider>;

// 2. The Real Implementation (Auth0 style `/.well-known/jwks.json`)
/// RemoteKeySet
///
/// Fetches the key set over HTTPS on every call.
#[derive(Clone)]
pub struct RemoteKeySet {
    client: reqwest::Client,
    url: String,
}

impl RemoteKeySet {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Key set location for an Auth0 tenant domain.
    pub fn for_domain(domain: &str) -> Self {
        Self::new(format!("https://{}/.well-known/jwks.json", domain))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetProvider for RemoteKeySet {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::error!("key set request to {} failed: {}", self.url, e);
            AuthError::KeySetUnavailable
        })?;

        if !response.status().is_success() {
            tracing::error!("key set endpoint {} answered {}", self.url, response.status());
            return Err(AuthError::KeySetUnavailable);
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!("key set from {} is not valid JSON: {}", self.url, e);
            AuthError::KeySetUnavailable
        })
    }
}

// 3. Static Implementation (tests, offline local runs)
/// StaticKeySet
///
/// Serves a fixed key set. Used by the test suite and by local runs that
/// sign their own tokens.
#[derive(Clone)]
pub struct StaticKeySet {
    keys: JwkSet,
}

impl StaticKeySet {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }
}

#[async_trait]
impl KeySetProvider for StaticKeySet {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        Ok(self.keys.clone())
    }
}

/// UnavailableKeySet
///
/// A provider whose key set can never be fetched, for exercising the
/// failure path.
#[derive(Clone, Copy)]
pub struct UnavailableKeySet;

#[async_trait]
impl KeySetProvider for UnavailableKeySet {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        Err(AuthError::KeySetUnavailable)
    }
}

// 4. Time-Bounded Cache
/// CachedKeySet
///
/// Wraps another provider and reuses its last successful answer for `ttl`.
/// A failed refresh is not cached.
pub struct CachedKeySet<P> {
    inner: P,
    ttl: Duration,
    cached: RwLock<Option<(Instant, JwkSet)>>,
}

impl<P: KeySetProvider> CachedKeySet<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<P: KeySetProvider> KeySetProvider for CachedKeySet<P> {
    async fn fetch_key_set(&self) -> Result<JwkSet, AuthError> {
        if let Some((fetched_at, keys)) = self.cached.read().await.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(keys.clone());
            }
        }

        let keys = self.inner.fetch_key_set().await?;
        *self.cached.write().await = Some((Instant::now(), keys.clone()));
        tracing::debug!("key set refreshed ({} keys)", keys.keys.len());
        Ok(keys)
    }
}
