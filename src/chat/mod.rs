//! Chat Bridge
//!
//! Connects to an IRC channel (Twitch chat by default) and forwards lines
//! that pass the content policy into the broadcast hub.
//!
//! - [`policy`]: which lines are worth forwarding
//! - [`irc`]: line parsing
//! - [`session`]: per-connection protocol state (registration, nick
//!   collisions, PING/PONG, PRIVMSG filtering)
//! - [`bridge`]: connection loop with reconnect backoff

pub mod bridge;
pub mod irc;
pub mod policy;
pub mod session;

pub use bridge::{Backoff, ChatBridge, ChatStream, Connector, TcpConnector};
pub use irc::IrcMessage;
pub use policy::should_forward;
pub use session::{ChatSession, SessionAction};

use serde::Deserialize;
use thiserror::Error;

/// Chat bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_tls")]
    pub tls: bool,

    /// Bot nickname; the bridge is not started while this is empty
    #[serde(default)]
    pub nickname: String,

    /// Server password (`oauth:...` token on Twitch)
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_channel")]
    pub channel: String,

    /// Label prefixed to forwarded lines
    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "irc.chat.twitch.tv".to_string()
}

fn default_port() -> u16 {
    6697
}

fn default_tls() -> bool {
    true
}

fn default_channel() -> String {
    "#kapellosaur".to_string()
}

fn default_tag() -> String {
    "KNUK TATS".to_string()
}

fn default_reconnect_initial() -> u64 {
    1000
}

fn default_reconnect_max() -> u64 {
    60_000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            tls: default_tls(),
            nickname: String::new(),
            password: None,
            channel: default_channel(),
            tag: default_tag(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
        }
    }
}

impl ChatConfig {
    /// Whether there is enough configuration to connect
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.nickname.is_empty() && !self.host.is_empty()
    }
}

/// Chat bridge errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] tokio_native_tls::native_tls::Error),

    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::AnyDelimiterCodecError),
}
