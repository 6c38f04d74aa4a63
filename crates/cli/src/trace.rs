// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation stage: per-request identifier, tracking headers and a
//! completion log line.

use std::time::Instant;

use rand::Rng;
use reqwest::header::HeaderName;
use tracing::info;

use crate::error::PipelineError;
use crate::expiry::epoch_ms;
use crate::request::{RequestDescriptor, Response};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const CLIENT_VERSION_HEADER: HeaderName = HeaderName::from_static("x-client-version");
pub const TIMESTAMP_HEADER: HeaderName = HeaderName::from_static("x-timestamp");

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// `req_<epoch-ms>_<9 base36 chars>`.
pub fn generate_request_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("req_{}_{suffix}", epoch_ms())
}

/// Tracks one logical request from gate to completion.
#[derive(Debug, Clone)]
pub struct Correlation {
    id: String,
    client_version: String,
    started: Instant,
}

impl Correlation {
    pub fn begin(client_version: &str) -> Self {
        Self {
            id: generate_request_id(),
            client_version: client_version.to_owned(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Clone `req` with the tracking headers.
    pub fn stamp(&self, req: &RequestDescriptor) -> RequestDescriptor {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        req.with_header(REQUEST_ID_HEADER, &self.id)
            .with_header(CLIENT_VERSION_HEADER, &self.client_version)
            .with_header(TIMESTAMP_HEADER, &timestamp)
    }

    /// Emit the completion line. Never changes the outcome.
    pub fn finish(&self, req: &RequestDescriptor, outcome: &Result<Response, PipelineError>) {
        let elapsed_ms = (self.started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
        match outcome {
            Ok(resp) => info!(
                request_id = %self.id,
                method = %req.method,
                url = %req.url,
                status = resp.status.as_u16(),
                elapsed_ms,
                "request completed"
            ),
            Err(e) => info!(
                request_id = %self.id,
                method = %req.method,
                url = %req.url,
                kind = %e.kind(),
                status = e.status(),
                elapsed_ms,
                "request failed"
            ),
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
