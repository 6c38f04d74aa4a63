// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry stage: decide whether a request needs credentials and attach them.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::credential::CredentialStore;
use crate::error::PipelineError;
use crate::navigate::Navigator;
use crate::request::RequestDescriptor;

/// What the gate decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Matches the allow-list; send as-is, no renewal on 401.
    Public,
    /// Needs a bearer token. `expired` asks for a renewal before sending.
    Protected { token: String, expired: bool },
}

pub struct RequestGate {
    public_paths: Vec<String>,
    login_route: String,
    credentials: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl RequestGate {
    pub fn new(
        public_paths: Vec<String>,
        login_route: String,
        credentials: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { public_paths, login_route, credentials, navigator }
    }

    pub fn is_public(&self, url: &str) -> bool {
        self.public_paths.iter().any(|p| url.contains(p.as_str()))
    }

    /// Classify `req`. A protected request with no stored token fails with
    /// `Unauthenticated` and redirects to the login route.
    pub fn admit(&self, req: &RequestDescriptor) -> Result<Admission, PipelineError> {
        if self.is_public(&req.url) {
            debug!(url = %req.url, "public request");
            return Ok(Admission::Public);
        }

        let Some(token) = self.credentials.access_token() else {
            debug!(url = %req.url, "no access token, redirecting to login");
            self.navigator.navigate_to(&self.login_route);
            return Err(PipelineError::Unauthenticated {
                message: "no access token, sign in required".to_owned(),
            });
        };

        let expired = self.credentials.is_expired();
        Ok(Admission::Protected { token, expired })
    }

    /// Clone `req` with the bearer token and JSON content negotiation.
    pub fn authorize(&self, req: &RequestDescriptor, token: &str) -> RequestDescriptor {
        req.with_bearer(token)
            .with_header(CONTENT_TYPE, "application/json")
            .with_header(ACCEPT, "application/json")
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
