// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token minting, mocks, and assertion helpers.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::config::PipelineConfig;
use crate::credential::CredentialStore;
use crate::navigate::Navigator;
use crate::pipeline::Pipeline;
use crate::refresh::RefreshCoordinator;
use crate::request::{RequestDescriptor, Response};
use crate::store::MemoryStore;
use crate::transport::{SendFuture, Transport, TransportFailure};

/// A structurally valid token whose payload carries `exp`. The signature
/// segment is junk; nothing here verifies it.
pub fn mint_token(exp: u64) -> String {
    mint_token_with(serde_json::json!({ "sub": "user-1", "exp": exp }))
}

/// A token with an arbitrary payload.
pub fn mint_token_with(payload: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2ln")
}

/// In-memory credential store holding `access`/`refresh`, if given.
pub fn credentials(access: Option<&str>, refresh: Option<&str>) -> Arc<CredentialStore> {
    let store = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new()), Duration::ZERO));
    match (access, refresh) {
        (Some(a), Some(r)) => store.set_tokens(a, r),
        (Some(a), None) => store.set_tokens(a, ""),
        (None, Some(r)) => store.set_tokens("", r),
        (None, None) => {}
    }
    store
}

/// Records every route it is asked to navigate to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.routes.lock().iter().filter(|r| *r == route).count()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: &str) {
        self.routes.lock().push(route.to_owned());
    }
}

/// Canned outcome for one [`MockTransport`] round trip.
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: Result<(u16, Bytes), TransportFailure>,
    delay: Duration,
}

impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self { outcome: Ok((status, Bytes::from(body.to_string()))), delay: Duration::ZERO }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::json(200, body)
    }

    pub fn empty(status: u16) -> Self {
        Self { outcome: Ok((status, Bytes::new())), delay: Duration::ZERO }
    }

    pub fn network(timed_out: bool, message: &str) -> Self {
        Self {
            outcome: Err(TransportFailure::Network { timed_out, message: message.to_owned() }),
            delay: Duration::ZERO,
        }
    }

    /// Resolve after `delay` instead of immediately.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = dyn Fn(&RequestDescriptor) -> MockReply + Send + Sync;

/// Scripted transport: a handler picks the reply for each request, and every
/// request is recorded in send order.
pub struct MockTransport {
    handler: Box<Handler>,
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&RequestDescriptor) -> MockReply + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), sent: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().clone()
    }

    /// Requests whose URL ends with `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RequestDescriptor> {
        self.sent.lock().iter().filter(|r| r.url.ends_with(path)).cloned().collect()
    }

    pub fn count_path(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

impl Transport for MockTransport {
    fn send(&self, req: RequestDescriptor) -> SendFuture<'_> {
        let reply = (self.handler)(&req);
        self.sent.lock().push(req);
        Box::pin(async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            let (status, body) = reply.outcome?;
            let code = StatusCode::from_u16(status).map_err(|e| TransportFailure::Network {
                timed_out: false,
                message: e.to_string(),
            })?;
            if !code.is_success() {
                return Err(TransportFailure::Status { status, body });
            }
            Ok(Response::new(code, body))
        })
    }
}

/// Everything a pipeline test needs to poke at.
pub struct Harness {
    pub pipeline: Pipeline,
    pub transport: Arc<MockTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub credentials: Arc<CredentialStore>,
    pub coordinator: Arc<RefreshCoordinator>,
}

impl Harness {
    /// Wire a pipeline over `transport` with default settings.
    pub fn new(transport: MockTransport, credentials: Arc<CredentialStore>) -> Self {
        Self::with_config(PipelineConfig::default(), transport, credentials)
    }

    pub fn with_config(
        config: PipelineConfig,
        transport: MockTransport,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        let transport = Arc::new(transport);
        let navigator = Arc::new(RecordingNavigator::default());
        let coordinator = RefreshCoordinator::new(
            &config,
            Arc::clone(&credentials),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );
        let pipeline = Pipeline::new(
            config,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&credentials),
            Arc::clone(&coordinator),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );
        Self { pipeline, transport, navigator, credentials, coordinator }
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
