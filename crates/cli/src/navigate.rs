// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation boundary: redirect the application to a named route.

use tokio::sync::broadcast;
use tracing::info;

/// Fire-and-forget route changes. Implementations must not block.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str);
}

/// Publishes route names on a broadcast channel. Sends with no subscribers
/// are dropped.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: broadcast::Sender<String>,
}

impl ChannelNavigator {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<String>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Navigator for ChannelNavigator {
    fn navigate_to(&self, route: &str) {
        info!(route, "navigating");
        let _ = self.tx.send(route.to_owned());
    }
}

#[cfg(test)]
#[path = "navigate_tests.rs"]
mod tests;
