// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod classify;
pub mod command;
pub mod config;
pub mod credential;
pub mod error;
pub mod expiry;
pub mod gate;
pub mod navigate;
pub mod pipeline;
pub mod refresh;
pub mod request;
pub mod store;
pub mod test_support;
pub mod trace;
pub mod transport;
