// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! # Event Pruner
//!
//! Background task that keeps the security event log bounded. Every sweep
//! it deletes the oldest records until at most `max_events` remain.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::store::EventStore;

/// Background pruner for the event log.
pub struct EventPruner {
    events: Arc<dyn EventStore>,
    max_events: usize,
    interval: Duration,
}

impl EventPruner {
    pub fn new(events: Arc<dyn EventStore>, max_events: usize, interval: Duration) -> Self {
        Self {
            events,
            max_events,
            interval,
        }
    }

    /// Run the pruning loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(pruner.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_events = self.max_events,
            "event pruner starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("event pruner shutting down");
                    return;
                }
            }

            self.prune_step();
        }
    }

    /// Execute one sweep.
    fn prune_step(&self) {
        let removed = self.events.prune(self.max_events);
        if removed > 0 {
            info!(removed, "pruned excess events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Event;
    use crate::store::InMemoryEventStore;

    #[tokio::test]
    async fn prune_step_bounds_the_log() {
        let events = Arc::new(InMemoryEventStore::new());
        for n in 0..7 {
            events
                .record(Event::successful_login(&format!("user{n}"), "INTERNAL", "10.0.0.1"))
                .unwrap();
        }

        let pruner = EventPruner::new(events.clone(), 5, Duration::from_secs(60));
        pruner.prune_step();
        assert_eq!(events.total(), 5);

        // No-op when already within bounds.
        pruner.prune_step();
        assert_eq!(events.total(), 5);
    }

    #[tokio::test]
    async fn run_exits_on_cancellation() {
        let events = Arc::new(InMemoryEventStore::new());
        let pruner = EventPruner::new(events, 5, Duration::from_secs(3600));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(pruner.run(shutdown.clone()));
        shutdown.cancel();
        handle.await.unwrap();
    }
}
