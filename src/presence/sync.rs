//! PresenceSyncer: drives the coordinator on a fixed interval
//!
//! Runs in a background tokio task. Each tick (or manual trigger) awaits one
//! refresh cycle before waiting again, so cycles never overlap. A failed cycle
//! is logged and left for the next tick; there is no retry in between.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::error::RefreshError;
use crate::presence::coordinator::PresenceCoordinator;

/// Background synchronization service
pub struct PresenceSyncer {
    coordinator: Arc<PresenceCoordinator>,
    interval: Duration,
    initial_delay: Duration,
    trigger: Notify,
}

impl PresenceSyncer {
    pub fn new(
        coordinator: Arc<PresenceCoordinator>,
        interval: Duration,
        initial_delay: Duration,
    ) -> Self {
        Self {
            coordinator,
            interval,
            initial_delay,
            trigger: Notify::new(),
        }
    }

    pub fn coordinator(&self) -> &Arc<PresenceCoordinator> {
        &self.coordinator
    }

    /// Start the background sync loop (runs forever)
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "[PresenceSync] Starting background sync (interval: {:?})",
            self.interval
        );

        if !self.initial_delay.is_zero() {
            time::sleep(self.initial_delay).await;
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.trigger.notified() => {
                    tracing::debug!("[PresenceSync] Manual refresh requested");
                }
            }

            self.sync_once().await;
        }
    }

    /// Ask the loop for an extra cycle. Requests made while one is pending
    /// collapse into a single cycle.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    async fn sync_once(&self) {
        match self.coordinator.refresh().await {
            Ok(table) => {
                tracing::debug!(
                    "[PresenceSync] Synced: {} hosts ({} active)",
                    table.len(),
                    table.active_count()
                );
            }
            Err(RefreshError::InProgress) => {
                tracing::debug!("[PresenceSync] Skipped: refresh already running");
            }
            Err(e) => {
                tracing::warn!("[PresenceSync] Sync failed: {}", e);
            }
        }
    }
}
