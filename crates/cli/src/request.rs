// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound request descriptors and transport responses.
//!
//! A [`RequestDescriptor`] is never mutated in place by the pipeline: every
//! stage derives a new descriptor through the `with_*` methods, so the
//! caller's original value stays available for replay and logging.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One logical HTTP request as produced by a call site.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: HeaderMap::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Clone with one header set (replacing any previous value).
    ///
    /// Values that are not valid header text are dropped with a debug log
    /// rather than failing the request.
    pub fn with_header(&self, name: HeaderName, value: &str) -> Self {
        let mut next = self.clone();
        match HeaderValue::from_str(value) {
            Ok(v) => {
                next.headers.insert(name, v);
            }
            Err(e) => tracing::debug!(header = %name, err = %e, "skipping invalid header value"),
        }
        next
    }

    /// Clone with `Authorization: Bearer <token>`.
    pub fn with_bearer(&self, token: &str) -> Self {
        self.with_header(AUTHORIZATION, &format!("Bearer {token}"))
    }

    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        let mut next = self.clone();
        next.body = Some(body.into());
        next
    }

    /// Clone with `value` serialized as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.with_body(bytes))
    }

    /// Header value as text, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.header(AUTHORIZATION.as_str()).and_then(|h| h.strip_prefix("Bearer "))
    }
}

/// A successful (2xx) response from the transport.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    /// Deserialize the body as JSON. An empty body reads as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
