// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::credential::CredentialStore;
use crate::error::ErrorKind;
use crate::expiry::epoch_secs;
use crate::request::RequestDescriptor;
use crate::store::MemoryStore;
use crate::test_support::{mint_token, RecordingNavigator};

use super::*;

fn gate() -> (RequestGate, Arc<CredentialStore>, Arc<RecordingNavigator>) {
    let config = PipelineConfig::default();
    let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new()), Duration::ZERO));
    let navigator = Arc::new(RecordingNavigator::default());
    let gate = RequestGate::new(
        config.public_paths,
        config.login_route,
        Arc::clone(&credentials),
        Arc::clone(&navigator) as Arc<dyn Navigator>,
    );
    (gate, credentials, navigator)
}

#[yare::parameterized(
    login    = { "/api/auth/login", true },
    register = { "https://host/api/auth/register?x=1", true },
    refresh  = { "/auth/refresh", true },
    reset    = { "/auth/reset-password/confirm", true },
    health   = { "/system/health", true },
    profile  = { "/auth/profile", false },
    screens  = { "/screens/7", false },
)]
fn classifies_public_paths(url: &str, public: bool) {
    let (gate, _, _) = gate();
    assert_eq!(gate.is_public(url), public);
}

#[test]
fn public_request_needs_no_token() -> anyhow::Result<()> {
    let (gate, _, navigator) = gate();
    let admission = gate.admit(&RequestDescriptor::post("/auth/login"))?;
    assert_eq!(admission, Admission::Public);
    assert!(navigator.routes().is_empty());
    Ok(())
}

#[test]
fn protected_without_token_redirects_to_login() {
    let (gate, _, navigator) = gate();
    let result = gate.admit(&RequestDescriptor::get("/campaigns"));
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Unauthenticated));
    assert_eq!(navigator.routes(), vec!["/auth/login".to_owned()]);
}

#[test]
fn protected_with_valid_token() -> anyhow::Result<()> {
    let (gate, credentials, _) = gate();
    let token = mint_token(epoch_secs() + 600);
    credentials.set_tokens(&token, "R1");

    let admission = gate.admit(&RequestDescriptor::get("/campaigns"))?;
    assert_eq!(admission, Admission::Protected { token, expired: false });
    Ok(())
}

#[test]
fn protected_with_expired_token() -> anyhow::Result<()> {
    let (gate, credentials, _) = gate();
    credentials.set_tokens(&mint_token(epoch_secs() - 1), "R1");

    let admission = gate.admit(&RequestDescriptor::get("/campaigns"))?;
    assert!(matches!(admission, Admission::Protected { expired: true, .. }));
    Ok(())
}

#[test]
fn authorize_adds_bearer_and_json_headers() {
    let (gate, _, _) = gate();
    let original = RequestDescriptor::get("/campaigns");
    let authed = gate.authorize(&original, "T1");

    assert_eq!(authed.bearer(), Some("T1"));
    assert_eq!(authed.header("content-type"), Some("application/json"));
    assert_eq!(authed.header("accept"), Some("application/json"));
    assert!(original.headers.is_empty());
}
