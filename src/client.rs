// src/client.rs

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::ProfileGateError;
use crate::model::{JsonWebKeySet, KeySet};

/// Fetches and caches the verification key set for each issuer.
///
/// A key set is fetched at most once per issuer for the life of the process
/// and replaced wholesale on [`invalidate`]; there is no TTL and no
/// background refresh. Verification runs on every request, so the fetch
/// cost is amortized across the process lifetime.
///
/// Concurrent first calls for the same issuer coalesce into a single
/// in-flight fetch — the losers wait for and share its result instead of
/// issuing duplicates. Failed fetches are never cached, so the next caller
/// retries.
///
/// [`invalidate`]: JwksCache::invalidate
#[derive(Clone)]
pub struct JwksCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    http_client: reqwest::Client,
    jwks_uri_override: Option<Url>,
    // Cache stores issuer URL -> full key set.
    key_sets: Cache<String, Arc<KeySet>>,
}

impl JwksCache {
    /// Creates a new cache. `jwks_uri_override` bypasses the per-issuer
    /// well-known endpoint convention when set.
    pub fn new(jwks_uri_override: Option<Url>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http_client: reqwest::Client::new(),
                jwks_uri_override,
                // One entry per issuer; a handful at most.
                key_sets: Cache::new(16),
            }),
        }
    }

    /// Returns the key set for `issuer`, fetching it on first use.
    ///
    /// Fails with [`ProfileGateError::KeySetUnavailable`] when the fetch
    /// fails and no cached set exists for the issuer.
    #[instrument(skip(self), err)]
    pub async fn get(&self, issuer: &Url) -> Result<Arc<KeySet>, ProfileGateError> {
        let cache_key = issuer.as_str().to_string();
        self.inner
            .key_sets
            .try_get_with(cache_key, async {
                debug!("Key set cache miss for issuer: {}. Fetching.", issuer);
                self.fetch_key_set(issuer).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<ProfileGateError>| ProfileGateError::KeySetUnavailable {
                issuer: issuer.as_str().to_string(),
                reason: e.to_string(),
            })
    }

    /// Drops the cached set for `issuer`. The next [`get`] refetches.
    ///
    /// This is the only refresh trigger; key rotation is handled by an
    /// explicit bust, not a timer.
    ///
    /// [`get`]: JwksCache::get
    pub async fn invalidate(&self, issuer: &Url) {
        self.inner.key_sets.invalidate(issuer.as_str()).await;
    }

    #[instrument(skip(self), err)]
    async fn fetch_key_set(&self, issuer: &Url) -> Result<KeySet, ProfileGateError> {
        let jwks_uri = self.jwks_uri(issuer)?;
        let jwks: JsonWebKeySet = self
            .inner
            .http_client
            .get(jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let key_set = KeySet::from_json_web_key_set(jwks)?;
        info!(
            "Fetched {} verification keys for issuer: {}",
            key_set.len(),
            issuer
        );
        Ok(key_set)
    }

    /// The JWKS document location: an explicit override, or the issuer's
    /// well-known endpoint.
    fn jwks_uri(&self, issuer: &Url) -> Result<Url, ProfileGateError> {
        if let Some(uri) = self.inner.jwks_uri_override.clone() {
            debug!("Using JWKS URI from config override: {}", uri);
            return Ok(uri);
        }
        let well_known = format!(
            "{}/.well-known/jwks.json",
            issuer.as_str().trim_end_matches('/')
        );
        Url::parse(&well_known).map_err(|e| ProfileGateError::InvalidUrl(e.to_string()))
    }
}
