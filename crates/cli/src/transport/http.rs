// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `reqwest`-backed transport.

use std::sync::Once;
use std::time::Duration;

use reqwest::Client;

use crate::request::{RequestDescriptor, Response};
use crate::transport::{SendFuture, Transport, TransportFailure};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP transport for one API base URL.
///
/// Relative descriptor URLs (starting with `/`) are joined onto the base URL;
/// absolute URLs are used as given. Every call, including the refresh call,
/// is bounded by the client timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        ensure_crypto();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn round_trip(&self, req: RequestDescriptor) -> Result<Response, TransportFailure> {
        let mut builder =
            self.client.request(req.method.clone(), self.url(&req.url)).headers(req.headers);
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(network_failure)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(network_failure)?;

        if !status.is_success() {
            return Err(TransportFailure::Status { status: status.as_u16(), body });
        }
        Ok(Response { status, headers, body })
    }
}

fn network_failure(e: reqwest::Error) -> TransportFailure {
    TransportFailure::Network { timed_out: e.is_timeout(), message: e.to_string() }
}

impl Transport for HttpTransport {
    fn send(&self, req: RequestDescriptor) -> SendFuture<'_> {
        Box::pin(self.round_trip(req))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
