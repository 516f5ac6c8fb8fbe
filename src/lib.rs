//! # Knuxhub
//!
//! Real-time broadcast hub for Knuk Tats. Events from a Twitch/IRC channel,
//! a serial push-button and a heartbeat timer are fanned out to every
//! connected WebSocket client.
//!
//! ## Modules
//!
//! - [`websocket`]: Subscriber registry, broadcast hub and WebSocket adapter
//! - [`ticker`]: Periodic `tick N from server` heartbeat
//! - [`chat`]: IRC bridge with content policy and reconnect backoff
//! - [`button`]: Serial push-button bridge
//! - [`tattoo`]: Knuckle tattoo PNG renderer
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`lines`]: Line framing shared by the chat and button bridges
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knuxhub::{BroadcastHub, HubConfig, Ticker, TickerConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     // The hub is built first and handed to every source
//!     let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
//!     let shutdown = CancellationToken::new();
//!
//!     let ticker = Ticker::new(Arc::clone(&hub), &TickerConfig::default());
//!     let handle = ticker.start(shutdown.clone());
//!
//!     hub.broadcast("KNUK TATS: push butn").await;
//!
//!     shutdown.cancel();
//!     let _ = handle.await;
//! }
//! ```

pub mod api;
pub mod button;
pub mod chat;
pub mod config;
pub mod lines;
pub mod tattoo;
pub mod ticker;
pub mod websocket;

// Re-export top-level types for convenience
pub use websocket::{
    websocket_handler, BroadcastHub, BroadcastReport, DeliveryError, Frame, HubConfig, HubError,
    Message, SessionHandler, Subscriber, SubscriberRegistry, WireFormat, WsSubscriber,
};

pub use ticker::{Ticker, TickerConfig};

pub use chat::{should_forward, ChatBridge, ChatConfig, ChatError};

pub use button::{ButtonBridge, ButtonConfig, ButtonError};

pub use tattoo::{tattoo_letters, TattooConfig, TattooError, TattooRenderer};

pub use api::{build_router, serve, shutdown_signal, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
