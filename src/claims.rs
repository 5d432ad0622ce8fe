// src/claims.rs

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProfileGateError;

/// Checks expiry and resolves the stable subject identifier from a claims
/// map that has already passed signature verification.
///
/// `now` is caller-supplied seconds since the epoch, which keeps the expiry
/// check testable without a wall clock. The comparison is strict: a token
/// is still valid at the exact expiry instant and rejected one second past
/// it. No leeway is applied.
///
/// Subject resolution walks `subject_claims` in order and takes the first
/// claim that is present with a string value. The order encodes priority —
/// by default the provider-qualified name (`cognito:username`) wins over
/// the plain `username`. Recognizing another provider's field is a
/// one-entry addition to the configured list, not a code change.
pub fn resolve_subject(
    claims: &Map<String, Value>,
    now: u64,
    subject_claims: &[String],
) -> Result<String, ProfileGateError> {
    // A payload without a numeric expiry is not a token we can reason
    // about at all, so it is malformed rather than expired.
    let exp = claims
        .get("exp")
        .and_then(Value::as_u64)
        .ok_or(ProfileGateError::MalformedToken)?;
    if now > exp {
        debug!("Token expired at {}, now {}", exp, now);
        return Err(ProfileGateError::TokenExpired);
    }

    for name in subject_claims {
        if let Some(Value::String(subject)) = claims.get(name) {
            return Ok(subject.clone());
        }
    }
    Err(ProfileGateError::SubjectNotResolvable)
}
