// src/model.rs

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileGateError;

/// A structured JSON profile document, scoped to one subject.
///
/// The library only ever reads these; the shape is owned by whatever
/// writes the store, so it stays schemaless here.
pub type ProfileDocument = serde_json::Value;

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
#[derive(Debug, Deserialize)]
pub struct JsonWebKey {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_purpose: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// A single usable verification key: the published key identifier, the
/// algorithm bound to the key material, and the decoding key itself.
///
/// The algorithm is fixed here, at key-construction time. Verification
/// always uses this value and never the `alg` a token's header declares,
/// which closes off algorithm-substitution attacks.
#[derive(Clone)]
pub struct VerificationKey {
    pub key_id: String,
    pub algorithm: Algorithm,
    pub(crate) decoding_key: DecodingKey,
}

/// An ordered set of verification keys fetched from one issuer.
///
/// Key identifiers are treated as unique within a set; if an issuer
/// publishes duplicates, the first entry wins. A set is immutable once
/// built — refresh replaces it wholesale.
#[derive(Clone)]
pub struct KeySet {
    keys: Vec<VerificationKey>,
}

impl KeySet {
    /// Builds a `KeySet` from the wire-format JWKS document.
    ///
    /// Only RSA keys are usable; entries of other key types are skipped.
    /// An RSA entry missing its modulus or exponent fails the whole set,
    /// since a partially-built set would make key lookups ambiguous.
    pub fn from_json_web_key_set(jwks: JsonWebKeySet) -> Result<Self, ProfileGateError> {
        let mut keys = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                debug!("Skipping non-RSA key with kid: {}", jwk.kid);
                continue;
            }
            let n = jwk
                .n
                .as_ref()
                .ok_or_else(|| ProfileGateError::InvalidKeyFormat("missing 'n'".into()))?;
            let e = jwk
                .e
                .as_ref()
                .ok_or_else(|| ProfileGateError::InvalidKeyFormat("missing 'e'".into()))?;
            let decoding_key = DecodingKey::from_rsa_components(n, e)
                .map_err(|e| ProfileGateError::InvalidKeyFormat(e.to_string()))?;
            let algorithm = match jwk.alg.as_deref() {
                Some(alg) => alg
                    .parse()
                    .map_err(|_| ProfileGateError::InvalidKeyFormat(format!("unknown alg '{alg}'")))?,
                None => Algorithm::RS256,
            };
            keys.push(VerificationKey {
                key_id: jwk.kid,
                algorithm,
                decoding_key,
            });
        }
        Ok(Self { keys })
    }

    /// Returns the first key whose identifier equals `kid` exactly.
    ///
    /// Byte-for-byte string equality, no normalization, and no fallback:
    /// an unmatched identifier is a hard failure for the caller. Linear
    /// scan is fine — issuers publish tens of keys at most.
    pub fn find(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.iter().find(|key| key.key_id == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The inbound request envelope: a body carrying the bearer token.
///
/// The field name matches what existing clients send.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(rename = "jwttoken")]
    pub token: String,
}

/// The success envelope returned to callers.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileDocument,
    pub message: String,
}

impl ProfileResponse {
    pub fn new(profile: ProfileDocument) -> Self {
        Self {
            profile,
            message: "User profile successfully fetched".to_string(),
        }
    }
}

/// The failure envelope: a status class and a fixed message, nothing else.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl From<&ProfileGateError> for ErrorResponse {
    fn from(err: &ProfileGateError) -> Self {
        Self {
            message: err.public_message().to_string(),
        }
    }
}
