// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use crate::expiry::epoch_secs;
use crate::test_support::{credentials, mint_token};

use super::*;

#[test]
fn empty_store_reports_signed_out() -> anyhow::Result<()> {
    let status = CredentialStatus::of(&credentials(None, None));
    assert_eq!(
        serde_json::to_value(&status)?,
        json!({ "authenticated": false, "has_refresh_token": false, "expired": false })
    );
    Ok(())
}

#[test]
fn live_token_reports_remaining_seconds() {
    let exp = epoch_secs() + 600;
    let status = CredentialStatus::of(&credentials(Some(&mint_token(exp)), Some("R1")));

    assert!(status.authenticated);
    assert!(status.has_refresh_token);
    assert!(!status.expired);
    assert_eq!(status.expires_at, Some(exp));
    assert!(status.expires_in.is_some_and(|s| s > 590 && s <= 600));
}

#[test]
fn lapsed_token_reports_expired() {
    let lapsed = mint_token(epoch_secs() - 5);
    let status = CredentialStatus::of(&credentials(Some(&lapsed), Some("R1")));
    assert!(status.expired);
    assert_eq!(status.expires_in, None);
}
