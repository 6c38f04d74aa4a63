// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The request pipeline: gate, correlation, transport, classifier.
//!
//! A protected request that comes back 401 on its first send is renewed
//! through the [`RefreshCoordinator`] and resubmitted exactly once with the
//! same tracking headers and the new bearer value. It never passes the gate
//! a second time.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, Instrument};

use crate::classify::{Attempt, ResponseClassifier, Verdict};
use crate::config::PipelineConfig;
use crate::credential::CredentialStore;
use crate::error::{ErrorKind, PipelineError};
use crate::gate::{Admission, RequestGate};
use crate::navigate::Navigator;
use crate::refresh::RefreshCoordinator;
use crate::request::{RequestDescriptor, Response};
use crate::store::KeyValueStore;
use crate::trace::Correlation;
use crate::transport::http::HttpTransport;
use crate::transport::Transport;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "token", alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
}

pub struct Pipeline {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    gate: RequestGate,
    classifier: ResponseClassifier,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let gate = RequestGate::new(
            config.public_paths.clone(),
            config.login_route.clone(),
            Arc::clone(&credentials),
            Arc::clone(&navigator),
        );
        let classifier = ResponseClassifier::new(
            config.maintenance_route.clone(),
            config.maintenance_flag.clone(),
            config.maintenance_keyword.clone(),
            navigator,
        );
        Self { config, transport, credentials, coordinator, gate, classifier }
    }

    /// Wire a pipeline over HTTP against `config.base_url`.
    pub fn connect(
        config: PipelineConfig,
        backend: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config.base_url, config.timeout())?);
        let credentials = Arc::new(CredentialStore::new(backend, config.expiry_margin()));
        let coordinator = RefreshCoordinator::new(
            &config,
            Arc::clone(&credentials),
            Arc::clone(&transport),
            Arc::clone(&navigator),
        );
        Ok(Self::new(config, transport, credentials, coordinator, navigator))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send one request through every stage.
    pub async fn send(&self, req: RequestDescriptor) -> Result<Response, PipelineError> {
        let correlation = Correlation::begin(&self.config.client_version);
        let span = info_span!(
            "request",
            request_id = %correlation.id(),
            method = %req.method,
            url = %req.url,
        );
        async {
            let outcome = self.dispatch(&correlation, &req).await;
            correlation.finish(&req, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        correlation: &Correlation,
        req: &RequestDescriptor,
    ) -> Result<Response, PipelineError> {
        let (outbound, attempt) = match self.gate.admit(req)? {
            Admission::Public => (correlation.stamp(req), Attempt::Public),
            Admission::Protected { token, expired: false } => {
                (correlation.stamp(&self.gate.authorize(req, &token)), Attempt::First)
            }
            Admission::Protected { token, expired: true } => {
                debug!("access token expired, renewing before send");
                let fresh = self.coordinator.renew(&token).await?;
                (correlation.stamp(&self.gate.authorize(req, &fresh)), Attempt::Replay)
            }
        };

        let failure = match self.transport.send(outbound.clone()).await {
            Ok(resp) => return Ok(resp),
            Err(failure) => failure,
        };

        match self.classifier.inspect(failure, attempt) {
            Verdict::Fail(err) => Err(err),
            Verdict::Renew => {
                // Only a first protected send is renewed, so the bearer is set.
                let stale = outbound.bearer().unwrap_or_default();
                let fresh = self.coordinator.renew(stale).await?;
                info!(kind = %ErrorKind::TokenExpiredRetried, "replaying with renewed token");
                self.transport
                    .send(outbound.with_bearer(&fresh))
                    .await
                    .map_err(|f| self.classifier.classify(f))
            }
        }
    }

    /// Send a bodiless request and decode a JSON response.
    async fn call<T: DeserializeOwned>(&self, req: RequestDescriptor) -> Result<T, PipelineError> {
        let resp = self.send(req).await?;
        decode(&resp)
    }

    /// Attach `body` as JSON, send, and decode a JSON response.
    async fn call_with<B, T>(&self, req: RequestDescriptor, body: &B) -> Result<T, PipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(encode(req, body)?).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PipelineError> {
        self.call(RequestDescriptor::get(path)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, PipelineError> {
        self.call(RequestDescriptor::delete(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, PipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with(RequestDescriptor::post(path), body).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, PipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with(RequestDescriptor::put(path), body).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, PipelineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with(RequestDescriptor::patch(path), body).await
    }

    /// True when the health endpoint answers with a 2xx.
    pub async fn check_connectivity(&self) -> bool {
        match self.send(RequestDescriptor::get(self.config.health_path.as_str())).await {
            Ok(_) => true,
            Err(e) => {
                debug!(err = %e, "connectivity probe failed");
                false
            }
        }
    }

    /// Exchange credentials for a token pair and store it.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), PipelineError> {
        let req = RequestDescriptor::post(self.config.login_path.as_str());
        let resp = self.send(encode(req, &LoginRequest { email, password })?).await?;
        let tokens: LoginResponse = decode(&resp)?;
        if tokens.access_token.is_empty() {
            return Err(PipelineError::ServerError {
                status: resp.status.as_u16(),
                message: "login response has no access token".to_owned(),
                body: resp.json().unwrap_or_default(),
            });
        }
        let refresh = tokens.refresh_token.as_deref().unwrap_or("");
        self.credentials.set_tokens(&tokens.access_token, refresh);
        info!("signed in");
        Ok(())
    }

    pub fn logout(&self) {
        self.credentials.clear();
        info!("signed out");
    }
}

fn encode<B: Serialize + ?Sized>(
    req: RequestDescriptor,
    body: &B,
) -> Result<RequestDescriptor, PipelineError> {
    req.with_json(body).map_err(|e| PipelineError::Transport {
        timed_out: false,
        message: format!("encode request body: {e}"),
    })
}

fn decode<T: DeserializeOwned>(resp: &Response) -> Result<T, PipelineError> {
    resp.json().map_err(|e| PipelineError::ServerError {
        status: resp.status.as_u16(),
        message: format!("invalid response body: {e}"),
        body: serde_json::Value::String(resp.text()),
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
