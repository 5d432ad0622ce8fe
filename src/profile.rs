// src/profile.rs

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ProfileGateError;
use crate::model::ProfileDocument;

/// Errors surfaced by an [`ObjectStore`] implementation.
///
/// "Not found" and "transport failed" must stay distinguishable: the
/// fetcher turns the former into [`ProfileGateError::ProfileNotFound`] and
/// the latter into a generic storage failure.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage transport error: {0}")]
    Transport(String),
}

/// Read-only object storage collaborator.
///
/// Implementations are expected to honor whatever deadline or cancellation
/// their underlying client carries; the fetcher itself imposes no retry or
/// backoff policy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
}

/// An [`ObjectStore`] backed by plain HTTP GETs against a base URL, e.g. a
/// bucket website endpoint or an internal blob gateway.
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpObjectStore {
    pub fn new(mut base_url: Url) -> Self {
        // Url::join treats a path without a trailing slash as a file and
        // would drop its last segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self {
            http_client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let url = self
            .base_url
            .join(key)
            .map_err(|e| ObjectStoreError::Transport(e.to_string()))?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ObjectStoreError::Transport(e.to_string()))?;
        response
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::Transport(e.to_string()))
    }
}

/// Retrieves and decodes the stored profile document for a subject.
///
/// The storage key is derived deterministically as
/// `<subject>/<key_suffix>`; documents are stored gzip-compressed and are
/// small, so decompression and parsing happen eagerly in memory.
#[derive(Clone)]
pub struct ProfileFetcher {
    store: Arc<dyn ObjectStore>,
    key_suffix: String,
}

impl ProfileFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, key_suffix: String) -> Self {
        Self { store, key_suffix }
    }

    #[instrument(skip(self), err)]
    pub async fn fetch(&self, subject: &str) -> Result<ProfileDocument, ProfileGateError> {
        let key = format!("{}/{}", subject, self.key_suffix);
        debug!("Fetching profile object at key: {}", key);

        let compressed = self.store.get_object(&key).await.map_err(|e| match e {
            ObjectStoreError::NotFound(_) => ProfileGateError::ProfileNotFound(subject.to_string()),
            transport => ProfileGateError::Storage(transport),
        })?;

        let mut decoder = GzDecoder::new(compressed.as_ref());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ProfileGateError::ProfileCorrupt(format!("gzip: {e}")))?;

        serde_json::from_slice(&decompressed)
            .map_err(|e| ProfileGateError::ProfileCorrupt(format!("json: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    struct FakeStore {
        objects: HashMap<String, Bytes>,
        fail_transport: bool,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
            if self.fail_transport {
                return Err(ObjectStoreError::Transport("connection reset".into()));
            }
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
        }
    }

    fn gzip(bytes: &[u8]) -> Bytes {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    fn fetcher_with(objects: HashMap<String, Bytes>) -> ProfileFetcher {
        ProfileFetcher::new(
            Arc::new(FakeStore {
                objects,
                fail_transport: false,
            }),
            "profile.json.gz".to_string(),
        )
    }

    #[tokio::test]
    async fn round_trips_a_stored_profile() {
        let profile = json!({"displayName": "Alice", "preferences": {"theme": "dark"}});
        let mut objects = HashMap::new();
        objects.insert(
            "alice/profile.json.gz".to_string(),
            gzip(profile.to_string().as_bytes()),
        );

        let fetched = fetcher_with(objects).fetch("alice").await.unwrap();
        assert_eq!(fetched, profile);
    }

    #[tokio::test]
    async fn missing_object_is_profile_not_found() {
        let result = fetcher_with(HashMap::new()).fetch("bob").await;
        assert!(matches!(
            result,
            Err(ProfileGateError::ProfileNotFound(ref s)) if s == "bob"
        ));
    }

    #[tokio::test]
    async fn truncated_gzip_is_profile_corrupt() {
        let full = gzip(br#"{"a": 1}"#);
        let mut objects = HashMap::new();
        objects.insert(
            "alice/profile.json.gz".to_string(),
            full.slice(..full.len() / 2),
        );

        let result = fetcher_with(objects).fetch("alice").await;
        assert!(matches!(result, Err(ProfileGateError::ProfileCorrupt(_))));
    }

    #[tokio::test]
    async fn valid_gzip_with_invalid_json_is_profile_corrupt() {
        let mut objects = HashMap::new();
        objects.insert(
            "alice/profile.json.gz".to_string(),
            gzip(b"not json at all"),
        );

        let result = fetcher_with(objects).fetch("alice").await;
        assert!(matches!(result, Err(ProfileGateError::ProfileCorrupt(_))));
    }

    #[tokio::test]
    async fn transport_failure_is_not_conflated_with_not_found() {
        let fetcher = ProfileFetcher::new(
            Arc::new(FakeStore {
                objects: HashMap::new(),
                fail_transport: true,
            }),
            "profile.json.gz".to_string(),
        );
        let result = fetcher.fetch("alice").await;
        assert!(matches!(result, Err(ProfileGateError::Storage(_))));
    }
}
