//! Application State
//!
//! Shared state accessible by all HTTP handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::tattoo::TattooRenderer;
use crate::websocket::BroadcastHub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Broadcast hub that WebSocket subscribers join
    pub hub: Arc<BroadcastHub>,
    /// Tattoo renderer, absent if its assets failed to load
    pub tattoo: Option<Arc<TattooRenderer>>,
    /// Text rendered when a tattoo request has none
    pub tattoo_default_text: String,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState without a tattoo renderer
    pub fn new(hub: Arc<BroadcastHub>, config: ServerConfig) -> Self {
        Self {
            hub,
            tattoo: None,
            tattoo_default_text: "KNUK TATS".to_string(),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Attach a tattoo renderer
    pub fn with_tattoo(mut self, renderer: TattooRenderer, default_text: impl Into<String>) -> Self {
        self.tattoo = Some(Arc::new(renderer));
        self.tattoo_default_text = default_text.into();
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket subscriber count
    pub async fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count().await
    }
}
