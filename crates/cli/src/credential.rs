// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: access token, refresh token and decoded expiry kept in
//! a [`KeyValueStore`].
//!
//! The expiry is always derived from the access token's own `exp` claim so
//! the pair can never drift. Reads go straight to the backing store; there
//! is no cached copy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::expiry::{decode_exp, epoch_secs, ExpiryEvaluator};
use crate::store::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const TOKEN_EXPIRY_KEY: &str = "token_expiry";

/// Expiry recorded for tokens whose claims cannot be decoded.
const EXPIRED_NOW: u64 = 0;

pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    expiry: ExpiryEvaluator,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, margin: Duration) -> Self {
        Self { backend, expiry: ExpiryEvaluator::new(margin) }
    }

    pub fn access_token(&self) -> Option<String> {
        self.backend.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Stored expiry as epoch seconds.
    pub fn expires_at(&self) -> Option<u64> {
        self.backend.get(TOKEN_EXPIRY_KEY).and_then(|v| v.trim().parse().ok())
    }

    /// Seconds until expiry, or `None` once expired or when unknown.
    pub fn expires_in(&self) -> Option<u64> {
        let exp = self.expires_at()?;
        let now = epoch_secs();
        (exp > now).then(|| exp - now)
    }

    /// Store a new pair and recompute the expiry from the access token.
    ///
    /// Never fails: a token without decodable claims is stored with an
    /// already-passed expiry, so the next protected request refreshes it.
    pub fn set_tokens(&self, access: &str, refresh: &str) {
        let exp = match decode_exp(access) {
            Ok(exp) => exp,
            Err(e) => {
                warn!(err = %e, "access token claims unreadable, marking expired");
                EXPIRED_NOW
            }
        };
        self.backend.set(ACCESS_TOKEN_KEY, access);
        self.backend.set(REFRESH_TOKEN_KEY, refresh);
        self.backend.set(TOKEN_EXPIRY_KEY, &exp.to_string());
        debug!(
            expires_at = exp,
            margin_secs = self.expiry.margin().as_secs(),
            "stored credential pair"
        );
    }

    pub fn clear(&self) {
        self.backend.remove(ACCESS_TOKEN_KEY);
        self.backend.remove(REFRESH_TOKEN_KEY);
        self.backend.remove(TOKEN_EXPIRY_KEY);
        debug!("cleared credential pair");
    }

    /// True when no expiry is stored or `exp <= now + margin`.
    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired(self.expires_at())
    }

    pub fn is_empty(&self) -> bool {
        self.access_token().is_none()
            && self.refresh_token().is_none()
            && self.expires_at().is_none()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .field("expires_at", &self.expires_at())
            .finish()
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
