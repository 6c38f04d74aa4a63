// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tokenpipe login`, `logout` and `status`.

use serde::Serialize;

use crate::credential::CredentialStore;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, clap::Args)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long, env = "TOKENPIPE_EMAIL")]
    pub email: String,
    /// Account password.
    #[arg(long, env = "TOKENPIPE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Snapshot printed by `tokenpipe status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub authenticated: bool,
    pub has_refresh_token: bool,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl CredentialStatus {
    pub fn of(credentials: &CredentialStore) -> Self {
        let authenticated = credentials.access_token().is_some();
        Self {
            authenticated,
            has_refresh_token: credentials.refresh_token().is_some(),
            expired: authenticated && credentials.is_expired(),
            expires_at: credentials.expires_at(),
            expires_in: credentials.expires_in(),
        }
    }
}

pub async fn login(pipeline: &Pipeline, args: &LoginArgs) -> i32 {
    match pipeline.login(&args.email, &args.password).await {
        Ok(()) => {
            println!("signed in as {}", args.email);
            0
        }
        Err(e) => super::report(&e),
    }
}

pub fn logout(pipeline: &Pipeline) -> i32 {
    pipeline.logout();
    println!("signed out");
    0
}

pub fn status(pipeline: &Pipeline) -> i32 {
    let status = CredentialStatus::of(pipeline.credentials());
    match serde_json::to_string_pretty(&status) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
