//! Data Transfer Objects
//!
//! Request and response types for the HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Query string of the tattoo endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TattooQuery {
    /// Text to put on the knuckles
    pub t: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Connected WebSocket subscribers
    pub subscribers: usize,
    /// Whether the tattoo renderer is loaded
    pub tattoo: bool,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
