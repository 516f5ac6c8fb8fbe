//! Heartbeat Ticker
//!
//! Broadcasts `tick <N> from server` on a fixed interval for as long as the
//! process runs. The first tick fires immediately. A late tick pushes the
//! schedule back instead of firing a catch-up burst.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::websocket::BroadcastHub;

/// Ticker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TickerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    10
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Periodic heartbeat source
pub struct Ticker {
    hub: Arc<BroadcastHub>,
    interval: Duration,
    count: u64,
}

impl Ticker {
    pub fn new(hub: Arc<BroadcastHub>, config: &TickerConfig) -> Self {
        Self {
            hub,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            count: 0,
        }
    }

    /// Advance the counter and return the next heartbeat text
    pub fn next_message(&mut self) -> String {
        self.count += 1;
        format!("tick {} from server", self.count)
    }

    /// Number of ticks emitted so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Tick until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Heartbeat ticker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let message = self.next_message();
                    self.hub.broadcast(message).await;
                }
            }
        }

        tracing::info!(ticks = self.count, "Heartbeat ticker stopped");
    }

    /// Start the ticker background task
    pub fn start(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
