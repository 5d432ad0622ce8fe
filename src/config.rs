// src/config.rs

use crate::error::ProfileGateError;
use jsonwebtoken::Algorithm;
use url::Url;

/// The main configuration for the `profile-gate` pipeline.
///
/// This struct holds everything needed to verify tokens from one issuer
/// and locate the stored profile documents. It should be constructed
/// using the `ConfigBuilder`.
#[derive(Clone)]
pub struct Config {
    /// The issuer URL of the identity provider. Key sets are fetched from
    /// this issuer's well-known JWKS endpoint unless `jwks_uri` overrides it.
    pub issuer_url: Url,
    /// Optional override for the JWKS endpoint URL.
    pub jwks_uri: Option<Url>,
    /// The signing algorithms that are permitted. A token whose selected
    /// key carries any other algorithm is rejected.
    pub algorithms: Vec<Algorithm>,
    /// Recognized subject claim names, consulted in priority order. The
    /// first claim present in a verified token wins; adding support for
    /// another provider's field is a one-entry change here.
    pub subject_claims: Vec<String>,
    /// Appended to the subject identifier to form the storage key,
    /// as `<subject>/<suffix>`.
    pub profile_key_suffix: String,
}

/// A builder for creating a `Config` instance.
///
/// This builder provides a fluent API to ensure that the configuration is
/// constructed correctly and with all required fields.
#[derive(Default)]
pub struct ConfigBuilder {
    issuer_url: Option<Url>,
    jwks_uri: Option<Url>,
    algorithms: Option<Vec<Algorithm>>,
    subject_claims: Option<Vec<String>>,
    profile_key_suffix: Option<String>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issuer URL of the identity provider. This is a required field.
    ///
    /// # Arguments
    ///
    /// * `url` - The issuer URL, e.g.,
    ///   "https://cognito-idp.us-east-2.amazonaws.com/us-east-2_example".
    pub fn issuer_url(mut self, url: &str) -> Result<Self, ProfileGateError> {
        let parsed_url = Url::parse(url).map_err(|e| ProfileGateError::InvalidUrl(e.to_string()))?;
        self.issuer_url = Some(parsed_url);
        Ok(self)
    }

    /// Sets an explicit JWKS URI, bypassing the issuer's well-known
    /// endpoint. This is optional.
    pub fn jwks_uri(mut self, url: &str) -> Result<Self, ProfileGateError> {
        let parsed_url = Url::parse(url).map_err(|e| ProfileGateError::InvalidUrl(e.to_string()))?;
        self.jwks_uri = Some(parsed_url);
        Ok(self)
    }

    /// Sets the allowed signing algorithms.
    /// Defaults to `[Algorithm::RS256]` if not set.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = Some(algorithms);
        self
    }

    /// Sets the recognized subject claim names, highest priority first.
    /// Defaults to `["cognito:username", "username"]`.
    pub fn subject_claims(mut self, claims: Vec<String>) -> Self {
        self.subject_claims = Some(claims);
        self
    }

    /// Sets the storage-key suffix for profile documents.
    /// Defaults to `"profile.json.gz"`.
    pub fn profile_key_suffix(mut self, suffix: String) -> Self {
        self.profile_key_suffix = Some(suffix);
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if the required `issuer_url` field is missing.
    pub fn build(self) -> Result<Config, ProfileGateError> {
        let issuer_url = self
            .issuer_url
            .ok_or_else(|| ProfileGateError::MissingConfiguration("issuer_url".to_string()))?;

        Ok(Config {
            issuer_url,
            jwks_uri: self.jwks_uri,
            algorithms: self
                .algorithms
                .unwrap_or_else(|| vec![Algorithm::RS256]),
            subject_claims: self.subject_claims.unwrap_or_else(|| {
                vec!["cognito:username".to_string(), "username".to_string()]
            }),
            profile_key_suffix: self
                .profile_key_suffix
                .unwrap_or_else(|| "profile.json.gz".to_string()),
        })
    }
}
