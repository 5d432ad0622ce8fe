// src/pipeline.rs

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, instrument};

use crate::claims::resolve_subject;
use crate::client::JwksCache;
use crate::config::Config;
use crate::error::ProfileGateError;
use crate::model::ProfileDocument;
use crate::profile::{ObjectStore, ProfileFetcher};
use crate::token::RawToken;

/// The verification pipeline: token in, profile document (or a typed
/// failure) out.
///
/// Steps run in a fixed, fail-fast order — parse segments, extract the key
/// identifier, resolve the key set, select the key, verify the signature,
/// validate claims, fetch the profile. The first failure is terminal; the
/// pipeline never retries and never touches storage before verification
/// has fully succeeded.
///
/// The pipeline holds no per-request state. The key-set cache is injected
/// at construction so it can be shared process-wide and replaced with a
/// fake in tests.
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    jwks: JwksCache,
    fetcher: ProfileFetcher,
}

impl Pipeline {
    /// Creates a new `Pipeline`.
    ///
    /// `jwks` is typically shared across every pipeline and request in the
    /// process; `store` is the object-storage collaborator holding the
    /// compressed profile documents.
    pub fn new(config: Config, jwks: JwksCache, store: Arc<dyn ObjectStore>) -> Self {
        let fetcher = ProfileFetcher::new(store, config.profile_key_suffix.clone());
        Self {
            config,
            jwks,
            fetcher,
        }
    }

    /// Verifies `token` against the configured issuer and fetches the
    /// profile document for its subject, using the wall clock for the
    /// expiry check.
    pub async fn verify_and_fetch(&self, token: &str) -> Result<ProfileDocument, ProfileGateError> {
        self.verify_and_fetch_at(token, unix_now()).await
    }

    /// Same as [`verify_and_fetch`], with a caller-supplied current time
    /// in seconds since the epoch.
    ///
    /// [`verify_and_fetch`]: Pipeline::verify_and_fetch
    #[instrument(skip(self, token), err)]
    pub async fn verify_and_fetch_at(
        &self,
        token: &str,
        now: u64,
    ) -> Result<ProfileDocument, ProfileGateError> {
        let raw = RawToken::parse(token)?;
        let kid = raw.key_id()?;

        let key_set = self.jwks.get(&self.config.issuer_url).await?;
        let key = key_set
            .find(&kid)
            .ok_or(ProfileGateError::KeyNotFound(kid))?;
        if !self.config.algorithms.contains(&key.algorithm) {
            return Err(ProfileGateError::UnsupportedAlgorithm(key.algorithm));
        }

        // Claims stay out of reach until this conversion succeeds.
        let verified = raw
            .into_verified(key)
            .ok_or(ProfileGateError::SignatureInvalid)?;
        let claims = verified.claims()?;

        let subject = resolve_subject(&claims, now, &self.config.subject_claims)?;
        debug!("Token verified, subject resolved: {}", subject);

        self.fetcher.fetch(&subject).await
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
