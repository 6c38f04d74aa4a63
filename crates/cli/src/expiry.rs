// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-token expiry: decode the `exp` claim and compare against the clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Current wall-clock time as epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Extract the `exp` claim (epoch seconds) from a three-segment token.
///
/// The payload is accepted in URL-safe or standard base64, padded or not.
pub fn decode_exp(token: &str) -> anyhow::Result<u64> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        anyhow::bail!("expected 3 token segments, found {}", segments.len());
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| anyhow::anyhow!("payload is not base64: {e}"))?;

    let claims: serde_json::Value = serde_json::from_slice(&bytes)?;
    let exp = &claims["exp"];
    if let Some(secs) = exp.as_u64() {
        return Ok(secs);
    }
    match exp.as_f64() {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs as u64),
        _ => anyhow::bail!("token has no numeric exp claim"),
    }
}

/// Decides whether a stored expiry has passed.
///
/// `margin` treats tokens as expired that many seconds early. Zero keeps the
/// strict `exp <= now` comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryEvaluator {
    margin: Duration,
}

impl ExpiryEvaluator {
    pub fn new(margin: Duration) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    /// `None` (no recorded expiry) counts as expired.
    pub fn is_expired(&self, expires_at: Option<u64>) -> bool {
        self.is_expired_at(expires_at, epoch_secs())
    }

    pub fn is_expired_at(&self, expires_at: Option<u64>, now: u64) -> bool {
        match expires_at {
            Some(exp) => exp <= now.saturating_add(self.margin.as_secs()),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "expiry_tests.rs"]
mod tests;
