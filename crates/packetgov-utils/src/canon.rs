//! Canonical JSON emission and hashing.
//!
//! Every hash in the kernel (commit hashes, state hashes, log chain hashes,
//! checkpoint merkle roots) is SHA-256 over JCS (RFC 8785) canonical JSON:
//! keys sorted at every nesting level, no insignificant whitespace, UTF-8,
//! ES6 number serialization. Two structurally equal values always produce
//! identical bytes regardless of field order in the source.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Version of the canonicalization rules. Any change to the rules is a
/// breaking bump recorded in the DCL config lock.
pub const CANONICALIZATION_VERSION: &str = "1.0";

/// Canonicalization backend identifier.
pub const CANONICALIZATION_BACKEND: &str = "jcs-rfc8785";

/// Errors raised when a value cannot be canonicalized.
#[derive(Error, Debug)]
pub enum CanonError {
    #[error("failed to convert value to JSON: {0}")]
    ToValue(#[source] serde_json::Error),

    #[error("failed to canonicalize JSON: {message}")]
    Canonicalize { message: String },

    #[error("NaN/Infinity are not allowed in canonical JSON")]
    NonFiniteNumber,
}

/// Current time as a UTC ISO-8601 string with `Z` suffix.
///
/// This is the only timestamp format the kernel writes; strings in this form
/// hash deterministically without further normalization.
#[must_use]
pub fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Build a JSON number from a float, rejecting NaN and infinities.
///
/// `serde_json::Number` cannot represent non-finite floats; going through
/// this helper surfaces the error instead of silently degrading to `null`.
pub fn json_number(value: f64) -> Result<Value, CanonError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or(CanonError::NonFiniteNumber)
}

/// Emit a serializable value as JCS canonical JSON bytes.
pub fn canon<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let json_value = serde_json::to_value(value).map_err(CanonError::ToValue)?;
    canon_value(&json_value)
}

/// Emit a `serde_json::Value` as JCS canonical JSON bytes.
///
/// A `Value` is finite by construction (`Number` rejects NaN/Infinity), so
/// canonicalization of an existing value cannot hit the non-finite case.
pub fn canon_value(value: &Value) -> Result<Vec<u8>, CanonError> {
    serde_json_canonicalizer::to_vec(value).map_err(|e| CanonError::Canonicalize {
        message: e.to_string(),
    })
}

/// SHA-256 over the canonical JSON encoding of a value, as lowercase hex.
pub fn sha256_hex<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let payload = canon(value)?;
    Ok(sha256_hex_bytes(&payload))
}

/// SHA-256 over raw bytes, as lowercase hex.
#[must_use]
pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
