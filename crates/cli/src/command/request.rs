// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tokenpipe request` and `tokenpipe ping`.

use reqwest::Method;

use crate::pipeline::Pipeline;
use crate::request::{RequestDescriptor, Response};

use super::EXIT_CONFIG;

#[derive(Debug, Clone, clap::Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...).
    pub method: String,
    /// Path joined onto the base URL, or an absolute URL.
    pub path: String,
    /// JSON request body.
    #[arg(long)]
    pub data: Option<String>,
}

/// Build the descriptor for `args`, validating method and body.
pub fn build(args: &RequestArgs) -> anyhow::Result<RequestDescriptor> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid method: {}", args.method))?;
    let req = RequestDescriptor::new(method, args.path.as_str());
    match args.data {
        Some(ref data) => {
            let body: serde_json::Value = serde_json::from_str(data)
                .map_err(|e| anyhow::anyhow!("--data is not valid JSON: {e}"))?;
            req.with_json(&body)
        }
        None => Ok(req),
    }
}

/// Pretty-print JSON bodies; anything else verbatim.
pub fn render(resp: &Response) -> String {
    match serde_json::from_slice::<serde_json::Value>(&resp.body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| resp.text()),
        Err(_) => resp.text(),
    }
}

pub async fn run(pipeline: &Pipeline, args: &RequestArgs) -> i32 {
    let req = match build(args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };

    match pipeline.send(req).await {
        Ok(resp) => {
            let body = render(&resp);
            if !body.is_empty() {
                println!("{body}");
            }
            0
        }
        Err(e) => super::report(&e),
    }
}

pub async fn ping(pipeline: &Pipeline) -> i32 {
    if pipeline.check_connectivity().await {
        println!("ok");
        0
    } else {
        eprintln!("unreachable: {}", pipeline.config().base_url);
        1
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
