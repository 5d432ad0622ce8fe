// src/error.rs

use thiserror::Error;

use crate::profile::ObjectStoreError;

/// The primary error type for the `profile-gate` library.
///
/// Every pipeline failure is returned as a value of this enum; the library
/// never panics on bad input. Variants carry just enough context for
/// operator logs — the user-facing mapping goes through
/// [`ProfileGateError::status_code`] and [`ProfileGateError::public_message`]
/// so internal detail never reaches the caller.
#[derive(Debug, Error)]
pub enum ProfileGateError {
    #[error("token does not parse into three well-formed segments")]
    MalformedToken,

    #[error("key set unavailable for issuer {issuer}: {reason}")]
    KeySetUnavailable { issuer: String, reason: String },

    #[error("no verification key found for kid: {0}")]
    KeyNotFound(String),

    #[error("token signature verification failed")]
    SignatureInvalid,

    #[error("unsupported JWT algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("token is expired")]
    TokenExpired,

    #[error("no recognized subject claim present in token")]
    SubjectNotResolvable,

    #[error("no stored profile for subject: {0}")]
    ProfileNotFound(String),

    #[error("stored profile could not be decoded: {0}")]
    ProfileCorrupt(String),

    #[error("object storage error: {0}")]
    Storage(ObjectStoreError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid JWK format: {0}")]
    InvalidKeyFormat(String),
}

impl ProfileGateError {
    /// The HTTP status class the boundary layer should answer with.
    ///
    /// All authentication failures collapse to 401 so a caller cannot
    /// distinguish a bad signature from an unknown key identifier.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedToken
            | Self::KeyNotFound(_)
            | Self::SignatureInvalid
            | Self::UnsupportedAlgorithm(_)
            | Self::TokenExpired
            | Self::SubjectNotResolvable => 401,
            Self::ProfileNotFound(_) => 404,
            Self::KeySetUnavailable { .. } => 503,
            Self::ProfileCorrupt(_)
            | Self::Storage(_)
            | Self::InvalidUrl(_)
            | Self::MissingConfiguration(_)
            | Self::HttpError(_)
            | Self::InvalidKeyFormat(_) => 500,
        }
    }

    /// A fixed, non-leaking message suitable for a response body.
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            401 => "unauthorized",
            404 => "profile not found",
            503 => "verification keys unavailable",
            _ => "internal error",
        }
    }
}
