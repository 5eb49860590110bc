//! Access-token expiry inspection.
//!
//! Reads the `exp` claim from a JWT-shaped token without verifying the
//! signature. Everything here is pure; malformed input yields `None`/`false`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Refresh window used by the pipeline: two minutes before expiry.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(120);

/// Decode the absolute expiry instant from `token`'s payload segment.
#[must_use]
pub fn decode_expiry(token: &str) -> Option<SystemTime> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?;

    let secs = match exp.as_u64() {
        Some(secs) => Duration::from_secs(secs),
        None => {
            let secs = exp.as_f64().filter(|s| s.is_finite() && *s >= 0.0)?;
            Duration::try_from_secs_f64(secs).ok()?
        }
    };
    UNIX_EPOCH.checked_add(secs)
}

/// `true` iff the token decodes and expires strictly within `(now, now + threshold)`.
///
/// An already-expired token is not "expiring soon": the server will reject it
/// with 401 and unauthorized recovery takes over.
#[must_use]
pub fn is_expiring_soon(token: &str, now: SystemTime, threshold: Duration) -> bool {
    let Some(exp) = decode_expiry(token) else {
        return false;
    };
    match exp.duration_since(now) {
        Ok(remaining) => !remaining.is_zero() && remaining < threshold,
        Err(_) => false,
    }
}
