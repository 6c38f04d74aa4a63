// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of every outcome the pipeline can hand back to a call site.
///
/// `TokenExpiredRetried` is recovered inside the pipeline and only ever
/// appears in logs; the other kinds surface through [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthenticated,
    TokenExpiredRetried,
    RefreshFailed,
    MaintenanceActive,
    ServerError,
    ClientError,
    TransportError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::TokenExpiredRetried => "TOKEN_EXPIRED_RETRIED",
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::MaintenanceActive => "MAINTENANCE_ACTIVE",
            Self::ServerError => "SERVER_ERROR",
            Self::ClientError => "CLIENT_ERROR",
            Self::TransportError => "TRANSPORT_ERROR",
        }
    }

    /// Process exit code used by the `tokenpipe` binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unauthenticated | Self::RefreshFailed => 3,
            Self::MaintenanceActive => 4,
            Self::TokenExpiredRetried
            | Self::ServerError
            | Self::ClientError
            | Self::TransportError => 1,
        }
    }

    /// Whether this kind forces the client back to the login route.
    pub fn forces_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RefreshFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure returned by [`crate::pipeline::Pipeline::send`].
///
/// Variants carrying a `body` keep the server payload unchanged; `message`
/// is the human-readable text attached by the response classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// No access token was stored; the transport was never reached.
    Unauthenticated { message: String },
    /// The refresh endpoint rejected the refresh token, timed out, or no
    /// refresh token was available.
    RefreshFailed { status: Option<u16>, message: String },
    /// The server signalled maintenance mode (503 flag or 403 message).
    MaintenanceActive { status: u16, message: String, body: serde_json::Value },
    /// A 5xx other than maintenance.
    ServerError { status: u16, message: String, body: serde_json::Value },
    /// A 4xx the pipeline does not recover from.
    ClientError { status: u16, message: String, body: serde_json::Value },
    /// No status code: unreachable host, connection reset, or timeout.
    Transport { timed_out: bool, message: String },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            Self::RefreshFailed { .. } => ErrorKind::RefreshFailed,
            Self::MaintenanceActive { .. } => ErrorKind::MaintenanceActive,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::ClientError { .. } => ErrorKind::ClientError,
            Self::Transport { .. } => ErrorKind::TransportError,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { .. } | Self::Transport { .. } => None,
            Self::RefreshFailed { status, .. } => *status,
            Self::MaintenanceActive { status, .. }
            | Self::ServerError { status, .. }
            | Self::ClientError { status, .. } => Some(*status),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthenticated { message }
            | Self::RefreshFailed { message, .. }
            | Self::MaintenanceActive { message, .. }
            | Self::ServerError { message, .. }
            | Self::ClientError { message, .. }
            | Self::Transport { message, .. } => message,
        }
    }

    /// Original server payload, when the failure carried one.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::MaintenanceActive { body, .. }
            | Self::ServerError { body, .. }
            | Self::ClientError { body, .. } => Some(body),
            Self::Unauthenticated { .. } | Self::RefreshFailed { .. } | Self::Transport { .. } => {
                None
            }
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.kind().as_str().to_owned(),
            message: self.message().to_owned(),
            status: self.status(),
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse { error: self.to_error_body() }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => write!(f, "{} ({status}): {}", self.kind(), self.message()),
            None => write!(f, "{}: {}", self.kind(), self.message()),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Top-level error envelope written by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
