// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight access-token renewal.
//!
//! However many callers find the token expired (or rejected) at once, one
//! refresh call goes out. The first caller to arrive while idle is the
//! leader: it moves the coordinator to `InFlight` and spawns the refresh
//! call. Everyone, the leader included, then waits on a `oneshot` queued in
//! arrival order. On resolution the queue is drained front to back with the
//! same token or the same failure.
//!
//! The refresh call runs on its own task, so cancelling the leader or any
//! waiter never cancels it. A cancelled waiter removes itself from the queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::credential::CredentialStore;
use crate::error::PipelineError;
use crate::navigate::Navigator;
use crate::request::RequestDescriptor;
use crate::transport::{Transport, TransportFailure};

/// Observable coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    InFlight,
    /// Terminal failure being torn down: store cleared, waiters failed.
    Failed,
}

/// The failure every waiter of one refresh receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl From<RefreshFailure> for PipelineError {
    fn from(f: RefreshFailure) -> Self {
        PipelineError::RefreshFailed { status: f.status, message: f.message }
    }
}

type Outcome = Result<String, RefreshFailure>;

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Outcome>,
}

enum RefreshState {
    Idle,
    InFlight(VecDeque<Waiter>),
    Failed,
}

enum Enqueued {
    /// A newer token than the stale one is already stored.
    Ready(String),
    Waiting(u64, oneshot::Receiver<Outcome>),
    Rejected(RefreshFailure),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(alias = "token", alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    next_waiter: AtomicU64,
    refresh_calls: AtomicU64,
    refresh_path: String,
    login_route: String,
    timeout: Duration,
    credentials: Arc<CredentialStore>,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
}

impl RefreshCoordinator {
    pub fn new(
        config: &PipelineConfig,
        credentials: Arc<CredentialStore>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RefreshState::Idle),
            next_waiter: AtomicU64::new(0),
            refresh_calls: AtomicU64::new(0),
            refresh_path: config.refresh_path.clone(),
            login_route: config.login_route.clone(),
            timeout: config.timeout(),
            credentials,
            transport,
            navigator,
        })
    }

    pub fn phase(&self) -> RefreshPhase {
        match *self.state.lock() {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::InFlight(_) => RefreshPhase::InFlight,
            RefreshState::Failed => RefreshPhase::Failed,
        }
    }

    /// Callers currently queued behind an in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        match *self.state.lock() {
            RefreshState::InFlight(ref waiters) => waiters.len(),
            RefreshState::Idle | RefreshState::Failed => 0,
        }
    }

    /// Refresh calls issued since construction.
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::Relaxed)
    }

    /// Get a usable access token after `stale` was found expired or was
    /// rejected with 401.
    ///
    /// Returns the stored token without a network call when it already
    /// differs from `stale`; otherwise joins (or starts) the in-flight
    /// refresh.
    pub async fn renew(self: &Arc<Self>, stale: &str) -> Result<String, PipelineError> {
        let (id, rx) = match self.enqueue(stale) {
            Enqueued::Ready(token) => return Ok(token),
            Enqueued::Rejected(failure) => return Err(failure.into()),
            Enqueued::Waiting(id, rx) => (id, rx),
        };

        let _guard = WaiterGuard { coordinator: self, id };
        match rx.await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(PipelineError::RefreshFailed {
                status: None,
                message: "refresh abandoned before completing".to_owned(),
            }),
        }
    }

    fn enqueue(self: &Arc<Self>, stale: &str) -> Enqueued {
        let mut state = self.state.lock();
        if let RefreshState::InFlight(ref mut waiters) = *state {
            let (waiter, rx) = self.waiter();
            let id = waiter.id;
            waiters.push_back(waiter);
            debug!(waiter = id, queued = waiters.len(), "joined in-flight refresh");
            return Enqueued::Waiting(id, rx);
        }
        if matches!(*state, RefreshState::Failed) {
            return Enqueued::Rejected(session_ended());
        }

        // Cleared by an earlier failure; that teardown already ran.
        let Some(current) = self.credentials.access_token() else {
            debug!("no stored access token, session already ended");
            return Enqueued::Rejected(session_ended());
        };
        if current != stale {
            debug!("token already renewed by an earlier refresh");
            return Enqueued::Ready(current);
        }

        let Some(refresh_token) = self.credentials.refresh_token() else {
            *state = RefreshState::Failed;
            drop(state);
            let failure = RefreshFailure {
                status: None,
                message: "no refresh token, sign in again".to_owned(),
            };
            self.fail(VecDeque::new(), failure.clone());
            return Enqueued::Rejected(failure);
        };

        let (waiter, rx) = self.waiter();
        let id = waiter.id;
        *state = RefreshState::InFlight(VecDeque::from([waiter]));
        drop(state);

        debug!(leader = id, "starting token refresh");
        self.spawn_refresh(refresh_token);
        Enqueued::Waiting(id, rx)
    }

    fn waiter(&self) -> (Waiter, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
        (Waiter { id, tx }, rx)
    }

    fn spawn_refresh(self: &Arc<Self>, refresh_token: String) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let call = this.call_refresh(&refresh_token);
            let outcome = match tokio::time::timeout(this.timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RefreshFailure {
                    status: None,
                    message: format!("refresh timed out after {}ms", this.timeout.as_millis()),
                }),
            };
            this.resolve(outcome, refresh_token);
        });
    }

    async fn call_refresh(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshFailure> {
        self.refresh_calls.fetch_add(1, Ordering::Relaxed);

        let req = RequestDescriptor::post(self.refresh_path.as_str())
            .with_header(CONTENT_TYPE, "application/json")
            .with_header(ACCEPT, "application/json")
            .with_json(&RefreshRequest { refresh_token })
            .map_err(|e| RefreshFailure {
                status: None,
                message: format!("encode refresh request: {e}"),
            })?;

        let resp = self.transport.send(req).await.map_err(|failure| match failure {
            TransportFailure::Status { status, .. } => RefreshFailure {
                status: Some(status),
                message: format!("refresh rejected with HTTP {status}"),
            },
            TransportFailure::Network { timed_out: true, message } => {
                RefreshFailure { status: None, message: format!("refresh timed out: {message}") }
            }
            TransportFailure::Network { timed_out: false, message } => {
                RefreshFailure { status: None, message: format!("refresh unreachable: {message}") }
            }
        })?;

        let status = Some(resp.status.as_u16());
        let tokens: RefreshResponse = resp.json().map_err(|e| RefreshFailure {
            status,
            message: format!("invalid refresh response: {e}"),
        })?;
        if tokens.access_token.is_empty() {
            return Err(RefreshFailure {
                status,
                message: "refresh response has an empty access token".to_owned(),
            });
        }
        Ok(tokens)
    }

    fn resolve(&self, outcome: Result<RefreshResponse, RefreshFailure>, used_refresh: String) {
        match outcome {
            Ok(tokens) => {
                let refresh = tokens.refresh_token.unwrap_or(used_refresh);
                self.credentials.set_tokens(&tokens.access_token, &refresh);
                let waiters = self.take_waiters(RefreshState::Idle);
                info!(waiters = waiters.len(), "access token renewed");
                for waiter in waiters {
                    let _ = waiter.tx.send(Ok(tokens.access_token.clone()));
                }
            }
            Err(failure) => {
                let waiters = self.take_waiters(RefreshState::Failed);
                self.fail(waiters, failure);
            }
        }
    }

    fn take_waiters(&self, next: RefreshState) -> VecDeque<Waiter> {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        match previous {
            RefreshState::InFlight(waiters) => waiters,
            RefreshState::Idle | RefreshState::Failed => VecDeque::new(),
        }
    }

    /// Terminal failure: clear credentials, redirect once, fail every
    /// waiter with the same error, then re-arm.
    fn fail(&self, waiters: VecDeque<Waiter>, failure: RefreshFailure) {
        warn!(
            status = failure.status,
            waiters = waiters.len(),
            error = %failure.message,
            "token refresh failed, ending session"
        );
        self.credentials.clear();
        self.navigator.navigate_to(&self.login_route);
        for waiter in waiters {
            let _ = waiter.tx.send(Err(failure.clone()));
        }
        *self.state.lock() = RefreshState::Idle;
    }
}

fn session_ended() -> RefreshFailure {
    RefreshFailure { status: None, message: "session ended, sign in again".to_owned() }
}

/// Removes a waiter from the queue if its caller stops waiting early.
struct WaiterGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    id: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.coordinator.state.lock();
        if let RefreshState::InFlight(ref mut waiters) = *state {
            if let Some(pos) = waiters.iter().position(|w| w.id == self.id) {
                waiters.remove(pos);
                debug!(waiter = self.id, "waiter left refresh queue");
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
