// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit stage: turn transport failures into the pipeline's error taxonomy.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::navigate::Navigator;
use crate::transport::TransportFailure;

/// Outcome of inspecting one failed round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 401 on a first attempt: renew the token and resubmit once.
    Renew,
    /// Surface this error to the caller.
    Fail(PipelineError),
}

/// How the request that failed was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Public request; 401 is never renewed.
    Public,
    /// Protected request on its first send.
    First,
    /// Protected request already sent with a renewed token.
    Replay,
}

pub struct ResponseClassifier {
    maintenance_route: String,
    maintenance_flag: String,
    maintenance_keyword: String,
    navigator: Arc<dyn Navigator>,
}

impl ResponseClassifier {
    pub fn new(
        maintenance_route: String,
        maintenance_flag: String,
        maintenance_keyword: String,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { maintenance_route, maintenance_flag, maintenance_keyword, navigator }
    }

    pub fn inspect(&self, failure: TransportFailure, attempt: Attempt) -> Verdict {
        match failure {
            TransportFailure::Status { status: 401, .. } if attempt == Attempt::First => {
                debug!("401 on first attempt, renewing token");
                Verdict::Renew
            }
            other => Verdict::Fail(self.classify(other)),
        }
    }

    /// Map a failure to a [`PipelineError`], redirecting to the maintenance
    /// route when the server reports maintenance.
    pub fn classify(&self, failure: TransportFailure) -> PipelineError {
        let body = failure.body_json();
        let status = match failure {
            TransportFailure::Network { timed_out, message } => {
                return PipelineError::Transport { timed_out, message };
            }
            TransportFailure::Status { status, .. } => status,
        };

        let message = status_message(status, &body);
        if self.is_maintenance(status, &body) {
            warn!(status, route = %self.maintenance_route, "server in maintenance");
            self.navigator.navigate_to(&self.maintenance_route);
            return PipelineError::MaintenanceActive { status, message, body };
        }

        match status {
            400..=499 => PipelineError::ClientError { status, message, body },
            _ => PipelineError::ServerError { status, message, body },
        }
    }

    fn is_maintenance(&self, status: u16, body: &serde_json::Value) -> bool {
        match status {
            503 => body[self.maintenance_flag.as_str()].as_bool().unwrap_or(false),
            403 => {
                let keyword = self.maintenance_keyword.to_lowercase();
                ["mensaje", "message"].iter().any(|field| {
                    body[*field].as_str().is_some_and(|m| m.to_lowercase().contains(&keyword))
                })
            }
            _ => false,
        }
    }
}

/// Human-readable message for a failed status.
pub fn status_message(status: u16, body: &serde_json::Value) -> String {
    match status {
        400 => body["message"].as_str().unwrap_or("bad request").to_owned(),
        401 => "unauthorized, sign in again".to_owned(),
        403 => "access denied, insufficient permissions".to_owned(),
        404 => "resource not found".to_owned(),
        422 => {
            let mut message = "invalid data".to_owned();
            if let Some(errors) = body["errors"].as_object() {
                for (field, messages) in errors {
                    let joined = match messages {
                        serde_json::Value::Array(items) => items
                            .iter()
                            .map(|m| m.as_str().map(str::to_owned).unwrap_or_else(|| m.to_string()))
                            .collect::<Vec<_>>()
                            .join(", "),
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    message.push_str(&format!("\n{field}: {joined}"));
                }
            }
            message
        }
        500 => "internal server error".to_owned(),
        503 => "service unavailable, try again later".to_owned(),
        _ => format!("server error: {status}"),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
