// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport boundary: send one descriptor, get a response or a failure.

pub mod http;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::request::{RequestDescriptor, Response};

/// Boxed future returned by [`Transport::send`].
pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, TransportFailure>> + Send + 'a>>;

/// Abstract HTTP round trip.
///
/// Object-safe for use as `Arc<dyn Transport>`. Any non-2xx status must be
/// reported as [`TransportFailure::Status`].
pub trait Transport: Send + Sync + 'static {
    fn send(&self, req: RequestDescriptor) -> SendFuture<'_>;
}

/// Why a round trip did not produce a 2xx response.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The server answered with a non-success status.
    Status { status: u16, body: Bytes },
    /// No status: connection refused, DNS failure, reset, or timeout.
    Network { timed_out: bool, message: String },
}

impl TransportFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } => None,
        }
    }

    /// The response body parsed as JSON. Non-JSON text becomes a string
    /// value; an empty body is `null`.
    pub fn body_json(&self) -> serde_json::Value {
        match self {
            Self::Status { body, .. } if body.is_empty() => serde_json::Value::Null,
            Self::Status { body, .. } => serde_json::from_slice(body).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
            }),
            Self::Network { .. } => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, .. } => write!(f, "HTTP {status}"),
            Self::Network { timed_out: true, message } => write!(f, "timed out: {message}"),
            Self::Network { timed_out: false, message } => write!(f, "network error: {message}"),
        }
    }
}

impl std::error::Error for TransportFailure {}
