//! WebSocket Message Types
//!
//! Defines the broadcast message and the wire formats it can be encoded to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Encoded form of a message, shared between subscriber queues
pub type Frame = Arc<str>;

/// How broadcast content is framed on the WebSocket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// The text frame is the content verbatim
    #[default]
    Text,
    /// The text frame is a JSON envelope (see [`ServerMessage`])
    Json,
}

impl WireFormat {
    /// Encode content into a frame
    pub fn encode(self, content: &str) -> Frame {
        match self {
            WireFormat::Text => Arc::from(content),
            WireFormat::Json => {
                let msg = ServerMessage::Broadcast { content };
                match serde_json::to_string(&msg) {
                    Ok(json) => Arc::from(json),
                    Err(e) => {
                        // Serializing a borrowed str cannot realistically fail
                        tracing::error!(error = %e, "Failed to serialize broadcast");
                        Arc::from(content)
                    }
                }
            }
        }
    }
}

/// Messages sent from server to client in the JSON wire format
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    /// A broadcast from one of the hub's sources
    Broadcast {
        /// Message content
        content: &'a str,
    },
}

/// An immutable broadcast message
///
/// The wire form is computed at most once, on first request, and reused
/// for every subscriber afterwards.
#[derive(Debug)]
pub struct Message {
    content: Arc<str>,
    prepared: OnceLock<Frame>,
}

impl Message {
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self {
            content: content.into(),
            prepared: OnceLock::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Return the cached wire form, encoding it on first use
    pub fn prepared(&self, format: WireFormat) -> Frame {
        Arc::clone(self.prepared.get_or_init(|| format.encode(&self.content)))
    }

    /// Whether the wire form has been computed
    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}
