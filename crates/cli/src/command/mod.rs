// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands: `login`, `logout`, `status`, `request`, `ping`.

pub mod auth;
pub mod request;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::config::Config;
use crate::error::PipelineError;
use crate::navigate::ChannelNavigator;
use crate::pipeline::Pipeline;
use crate::store::FileStore;

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: i32 = 2;

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Sign in and store the token pair.
    Login(auth::LoginArgs),
    /// Forget stored credentials.
    Logout,
    /// Show stored credential state as JSON.
    Status,
    /// Send one request through the pipeline and print the response body.
    Request(request::RequestArgs),
    /// Probe the health endpoint.
    Ping,
}

/// Run the selected subcommand. Returns a process exit code.
pub async fn run(config: &Config) -> i32 {
    let pipeline_config = match config.pipeline() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_CONFIG;
        }
    };
    let store = match FileStore::open(config.store_path()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_CONFIG;
        }
    };
    debug!(path = %store.path().display(), "opened credential store");

    let (navigator, mut routes) = ChannelNavigator::new(16);
    let pipeline = match Pipeline::connect(pipeline_config, Arc::new(store), Arc::new(navigator)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_CONFIG;
        }
    };

    let code = match config.command {
        Command::Login(ref args) => auth::login(&pipeline, args).await,
        Command::Logout => auth::logout(&pipeline),
        Command::Status => auth::status(&pipeline),
        Command::Request(ref args) => request::run(&pipeline, args).await,
        Command::Ping => request::ping(&pipeline).await,
    };

    print_navigation(&mut routes);
    code
}

/// Print the error envelope to stderr and map the error to an exit code.
pub fn report(err: &PipelineError) -> i32 {
    match serde_json::to_string_pretty(&err.to_error_response()) {
        Ok(envelope) => eprintln!("{envelope}"),
        Err(_) => eprintln!("error: {err}"),
    }
    if err.kind().forces_login() {
        eprintln!("hint: run `tokenpipe login` to sign in again");
    }
    err.kind().exit_code()
}

fn print_navigation(routes: &mut broadcast::Receiver<String>) {
    while let Ok(route) = routes.try_recv() {
        eprintln!("navigate: {route}");
    }
}
