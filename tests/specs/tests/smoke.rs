// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that run the real `tokenpipe` binary against a
//! fake API and check exit codes, output, and the credential store file.

use std::sync::atomic::Ordering;

use serde_json::Value;

use tokenpipe_specs::{free_port, mint_token, spawn_api, stderr, stdout, FakeApi, Session};

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[tokio::test]
async fn status_before_login() -> anyhow::Result<()> {
    let session = Session::new("http://127.0.0.1:9/api")?;

    let out = session.run(&["status"]).await?;

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let status: Value = serde_json::from_str(&stdout(&out))?;
    assert_eq!(status["authenticated"], false);
    assert_eq!(status["has_refresh_token"], false);
    Ok(())
}

#[tokio::test]
async fn login_then_request() -> anyhow::Result<()> {
    let token = mint_token(now() + 3600);
    let api = FakeApi::new(&token, &token);
    let session = Session::for_api(spawn_api(api).await?)?;

    let out = session.login().await?;
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(session.stored()?["access_token"], token.as_str());
    assert_eq!(session.stored()?["refresh_token"], "R1");

    let out = session.run(&["request", "GET", "/campaigns"]).await?;
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let body: Value = serde_json::from_str(&stdout(&out))?;
    assert_eq!(body["items"][0], "spring");

    let status: Value = serde_json::from_str(&stdout(&session.run(&["status"]).await?))?;
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["expired"], false);
    assert!(status["expires_in"].as_u64().is_some_and(|s| s > 3500));
    Ok(())
}

#[tokio::test]
async fn wrong_password_exits_with_client_error() -> anyhow::Result<()> {
    let api = FakeApi::new("t", "t");
    let session = Session::for_api(spawn_api(api).await?)?;

    let out = session.run(&["login", "--email", "ana@example.com", "--password", "nope"]).await?;

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("CLIENT_ERROR"), "stderr: {}", stderr(&out));
    assert_eq!(session.stored()?.get("access_token"), None);
    Ok(())
}

#[tokio::test]
async fn request_without_login_redirects() -> anyhow::Result<()> {
    let api = FakeApi::new("t", "t");
    let session = Session::for_api(spawn_api(api).await?)?;

    let out = session.run(&["request", "GET", "/campaigns"]).await?;

    assert_eq!(out.status.code(), Some(3));
    let err = stderr(&out);
    assert!(err.contains("\"UNAUTHENTICATED\""), "stderr: {err}");
    assert!(err.contains("navigate: /auth/login"), "stderr: {err}");
    assert!(err.contains("tokenpipe login"), "stderr: {err}");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_renewed_transparently() -> anyhow::Result<()> {
    let expired = mint_token(now() - 60);
    let renewed = mint_token(now() + 3600);
    let api = FakeApi::new(&expired, &renewed);
    let session = Session::for_api(spawn_api(std::sync::Arc::clone(&api)).await?)?;

    assert_eq!(session.login().await?.status.code(), Some(0));
    let out = session.run(&["request", "get", "/campaigns"]).await?;

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    let stored = session.stored()?;
    assert_eq!(stored["access_token"], renewed.as_str());
    assert_eq!(stored["refresh_token"], "R2");
    Ok(())
}

#[tokio::test]
async fn maintenance_exits_with_code_4() -> anyhow::Result<()> {
    let token = mint_token(now() + 3600);
    let api = FakeApi::new(&token, &token);
    api.maintenance.store(true, Ordering::SeqCst);
    let session = Session::for_api(spawn_api(api).await?)?;
    assert_eq!(session.login().await?.status.code(), Some(0));

    let out = session.run(&["request", "GET", "/campaigns"]).await?;

    assert_eq!(out.status.code(), Some(4));
    let err = stderr(&out);
    assert!(err.contains("MAINTENANCE_ACTIVE"), "stderr: {err}");
    assert!(err.contains("navigate: /mantenimiento"), "stderr: {err}");
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_store() -> anyhow::Result<()> {
    let token = mint_token(now() + 3600);
    let session = Session::for_api(spawn_api(FakeApi::new(&token, &token)).await?)?;
    assert_eq!(session.login().await?.status.code(), Some(0));

    assert_eq!(session.run(&["logout"]).await?.status.code(), Some(0));

    assert_eq!(session.stored()?.get("access_token"), None);
    let status: Value = serde_json::from_str(&stdout(&session.run(&["status"]).await?))?;
    assert_eq!(status["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn ping_reports_reachability() -> anyhow::Result<()> {
    let up = Session::for_api(spawn_api(FakeApi::new("t", "t")).await?)?;
    let out = up.run(&["ping"]).await?;
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out).trim(), "ok");

    let down = Session::new(format!("http://127.0.0.1:{}/api", free_port()?))?;
    assert_eq!(down.run(&["ping"]).await?.status.code(), Some(1));
    Ok(())
}

#[tokio::test]
async fn bad_base_url_is_a_config_error() -> anyhow::Result<()> {
    let session = Session::new("ftp://example.com")?;
    let out = session.run(&["status"]).await?;
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("http:// or https://"));
    Ok(())
}
