// src/token.rs

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ProfileGateError;
use crate::model::VerificationKey;

/// The part of a JWT header this library cares about.
#[derive(Debug, Deserialize)]
struct TokenHeader {
    kid: Option<String>,
}

/// A compact token split into its raw segments, signature still unchecked.
///
/// This type deliberately exposes no way to read the payload. Claims only
/// become reachable through [`VerifiedToken`], which can only be produced
/// by a successful [`RawToken::into_verified`] call, so no code path can
/// consult unverified claims.
pub(crate) struct RawToken<'a> {
    /// The exact signing input: header segment, separator, payload segment,
    /// as sliced out of the original token. Verification runs over these
    /// raw bytes — re-serializing the claims could alter them and break
    /// valid signatures.
    message: &'a str,
    header_segment: &'a str,
    payload_segment: &'a str,
    signature_segment: &'a str,
}

impl<'a> RawToken<'a> {
    /// Splits a compact token into its three base64url segments.
    pub(crate) fn parse(token: &'a str) -> Result<Self, ProfileGateError> {
        let (message, signature_segment) =
            token.rsplit_once('.').ok_or(ProfileGateError::MalformedToken)?;
        let (header_segment, payload_segment) =
            message.split_once('.').ok_or(ProfileGateError::MalformedToken)?;
        // A third '.' inside the message means more than three segments.
        if payload_segment.contains('.')
            || header_segment.is_empty()
            || payload_segment.is_empty()
            || signature_segment.is_empty()
        {
            return Err(ProfileGateError::MalformedToken);
        }
        Ok(Self {
            message,
            header_segment,
            payload_segment,
            signature_segment,
        })
    }

    /// Decodes the header segment and extracts the key identifier.
    ///
    /// The header is the one piece of the token read before verification,
    /// and only to pick the verification key — nothing in it is trusted.
    pub(crate) fn key_id(&self) -> Result<String, ProfileGateError> {
        let bytes = base64_url::decode(self.header_segment)
            .map_err(|_| ProfileGateError::MalformedToken)?;
        let header: TokenHeader =
            serde_json::from_slice(&bytes).map_err(|_| ProfileGateError::MalformedToken)?;
        header.kid.ok_or(ProfileGateError::MalformedToken)
    }

    /// Verifies the signature against `key` and, only on success, yields a
    /// [`VerifiedToken`] granting access to the claims.
    ///
    /// The algorithm comes from the key, never from the token header. Any
    /// failure — corrupt signature encoding, algorithm mismatch, wrong key —
    /// collapses to `None`; from the caller's perspective they are all
    /// "reject".
    pub(crate) fn into_verified(self, key: &VerificationKey) -> Option<VerifiedToken<'a>> {
        let verified = jsonwebtoken::crypto::verify(
            self.signature_segment,
            self.message.as_bytes(),
            &key.decoding_key,
            key.algorithm,
        )
        .unwrap_or(false);
        if verified {
            Some(VerifiedToken {
                payload_segment: self.payload_segment,
            })
        } else {
            None
        }
    }
}

/// Proof that a token's signature checked out against a selected key.
///
/// Holds only the payload segment; the signature has already served its
/// purpose and the header is no longer needed.
pub(crate) struct VerifiedToken<'a> {
    payload_segment: &'a str,
}

impl VerifiedToken<'_> {
    /// Decodes the payload segment into a claims map.
    pub(crate) fn claims(&self) -> Result<Map<String, Value>, ProfileGateError> {
        let bytes = base64_url::decode(self.payload_segment)
            .map_err(|_| ProfileGateError::MalformedToken)?;
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ProfileGateError::MalformedToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

    // HS256 keeps these unit tests free of RSA key material; the RSA path
    // goes through the same jsonwebtoken::crypto::verify call and is
    // covered by the integration tests.
    fn hs256_key(secret: &[u8]) -> VerificationKey {
        VerificationKey {
            key_id: "unit-test-key".to_string(),
            algorithm: Algorithm::HS256,
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    fn sign_token(header_json: &str, payload_json: &str, secret: &[u8]) -> String {
        let header = base64_url::encode(header_json);
        let payload = base64_url::encode(payload_json);
        let message = format!("{header}.{payload}");
        let signature = jsonwebtoken::crypto::sign(
            message.as_bytes(),
            &EncodingKey::from_secret(secret),
            Algorithm::HS256,
        )
        .unwrap();
        format!("{message}.{signature}")
    }

    #[test]
    fn parse_rejects_tokens_without_three_segments() {
        for bad in ["", "abc", "abc.def", "abc.def.ghi.jkl", "..", "a..c", ".b.c"] {
            assert!(
                matches!(RawToken::parse(bad), Err(ProfileGateError::MalformedToken)),
                "expected MalformedToken for {bad:?}"
            );
        }
    }

    #[test]
    fn key_id_requires_a_kid_field() {
        let with_kid = sign_token(r#"{"alg":"HS256","kid":"k1"}"#, r#"{"exp":1}"#, b"s");
        let token = RawToken::parse(&with_kid).unwrap();
        assert_eq!(token.key_id().unwrap(), "k1");

        let without_kid = sign_token(r#"{"alg":"HS256"}"#, r#"{"exp":1}"#, b"s");
        let token = RawToken::parse(&without_kid).unwrap();
        assert!(matches!(
            token.key_id(),
            Err(ProfileGateError::MalformedToken)
        ));
    }

    #[test]
    fn key_id_rejects_undecodable_header() {
        let garbled = "!!!not-base64url!!!.eyJleHAiOjF9.c2ln";
        let token = RawToken::parse(garbled).unwrap();
        assert!(matches!(
            token.key_id(),
            Err(ProfileGateError::MalformedToken)
        ));
    }

    #[test]
    fn valid_signature_grants_access_to_claims() {
        let secret = b"top-secret";
        let raw = sign_token(
            r#"{"alg":"HS256","kid":"k1"}"#,
            r#"{"exp":1700000000,"username":"alice"}"#,
            secret,
        );
        let verified = RawToken::parse(&raw)
            .unwrap()
            .into_verified(&hs256_key(secret))
            .expect("signature should verify");
        let claims = verified.claims().unwrap();
        assert_eq!(claims["username"], "alice");
    }

    #[test]
    fn single_byte_tamper_in_signature_is_rejected() {
        let secret = b"top-secret";
        let raw = sign_token(
            r#"{"alg":"HS256","kid":"k1"}"#,
            r#"{"exp":1700000000,"username":"alice"}"#,
            secret,
        );
        let (message, signature) = raw.rsplit_once('.').unwrap();
        let mut sig_bytes = signature.as_bytes().to_vec();
        // Flip within the base64url alphabet so decoding still succeeds.
        sig_bytes[0] = if sig_bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{message}.{}", String::from_utf8(sig_bytes).unwrap());

        let result = RawToken::parse(&tampered)
            .unwrap()
            .into_verified(&hs256_key(secret));
        assert!(result.is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let secret = b"top-secret";
        let raw = sign_token(
            r#"{"alg":"HS256","kid":"k1"}"#,
            r#"{"exp":1700000000,"username":"alice"}"#,
            secret,
        );
        let parts: Vec<&str> = raw.split('.').collect();
        let forged_payload = base64_url::encode(r#"{"exp":9999999999,"username":"mallory"}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        let result = RawToken::parse(&forged)
            .unwrap()
            .into_verified(&hs256_key(secret));
        assert!(result.is_none());
    }

    #[test]
    fn garbage_signature_encoding_is_not_verified_rather_than_an_error() {
        let secret = b"top-secret";
        let raw = sign_token(r#"{"alg":"HS256","kid":"k1"}"#, r#"{"exp":1}"#, secret);
        let message = raw.rsplit_once('.').unwrap().0;
        let garbled = format!("{message}.%%%not+valid+base64url%%%");

        // Must collapse to None, never panic or surface a distinct error.
        let result = RawToken::parse(&garbled)
            .unwrap()
            .into_verified(&hs256_key(secret));
        assert!(result.is_none());
    }
}
