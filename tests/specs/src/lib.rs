// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Runs the real `tokenpipe` binary as a subprocess against an in-process
//! fake API, with its credential store in a temporary directory.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub use tokenpipe::test_support::mint_token;

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "s3cret";

/// Resolve the path to the compiled `tokenpipe` binary.
pub fn tokenpipe_binary() -> PathBuf {
    if let Ok(dir) = std::env::var("CARGO_TARGET_DIR") {
        return PathBuf::from(dir).join("debug").join("tokenpipe");
    }
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("tokenpipe")
}

/// Shared state behind the fake API.
pub struct FakeApi {
    /// Access token handed out by `/auth/login`.
    pub issued: Mutex<String>,
    /// Access token handed out by `/auth/refresh`.
    pub renewed: String,
    /// The one bearer value protected routes accept.
    pub valid: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub maintenance: AtomicBool,
}

impl FakeApi {
    pub fn new(issued: &str, renewed: &str) -> Arc<Self> {
        Arc::new(Self {
            issued: Mutex::new(issued.to_owned()),
            renewed: renewed.to_owned(),
            valid: Mutex::new(issued.to_owned()),
            refresh_calls: AtomicUsize::new(0),
            maintenance: AtomicBool::new(false),
        })
    }
}

async fn login(State(api): State<Arc<FakeApi>>, Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad credentials" })));
    }
    let token = api.issued.lock().clone();
    (StatusCode::OK, Json(json!({ "token": token, "refreshToken": "R1" })))
}

async fn refresh(State(api): State<Arc<FakeApi>>, Json(body): Json<Value>) -> impl IntoResponse {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if body["refreshToken"] != "R1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad refresh token" })));
    }
    *api.valid.lock() = api.renewed.clone();
    (StatusCode::OK, Json(json!({ "accessToken": api.renewed, "refreshToken": "R2" })))
}

async fn campaigns(State(api): State<Arc<FakeApi>>, headers: HeaderMap) -> impl IntoResponse {
    if api.maintenance.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "enMantenimiento": true })));
    }
    let expected = format!("Bearer {}", api.valid.lock());
    let presented = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if presented != expected {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token expired" })));
    }
    (StatusCode::OK, Json(json!({ "items": ["spring", "summer"] })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Serve the fake API on a random local port.
pub async fn spawn_api(api: Arc<FakeApi>) -> anyhow::Result<SocketAddr> {
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/campaigns", get(campaigns))
        .route("/api/system/health", get(health))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// One CLI "home": a base URL plus a private credential store.
pub struct Session {
    base_url: String,
    dir: tempfile::TempDir,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self { base_url: base_url.into(), dir: tempfile::tempdir()? })
    }

    pub fn for_api(addr: SocketAddr) -> anyhow::Result<Self> {
        Self::new(format!("http://{addr}/api"))
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("credentials.json")
    }

    /// Parsed contents of the credential store file.
    pub fn stored(&self) -> anyhow::Result<Value> {
        match std::fs::read_to_string(self.store_path()) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(json!({})),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `tokenpipe <args>` against this session.
    pub async fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        let binary = tokenpipe_binary();
        anyhow::ensure!(binary.exists(), "tokenpipe binary not found at {}", binary.display());

        let output = tokio::process::Command::new(binary)
            .env_remove("TOKENPIPE_CONFIG")
            .env("TOKENPIPE_BASE_URL", &self.base_url)
            .env("TOKENPIPE_STORE", self.store_path())
            .env("TOKENPIPE_TIMEOUT_MS", "5000")
            .args(args)
            .output()
            .await?;
        Ok(output)
    }

    pub async fn login(&self) -> anyhow::Result<Output> {
        self.run(&["login", "--email", EMAIL, "--password", PASSWORD]).await
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
