//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::button::ButtonConfig;
use crate::chat::ChatConfig;
use crate::tattoo::TattooConfig;
use crate::ticker::TickerConfig;
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub ticker: TickerConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub button: ButtonConfig,

    #[serde(default)]
    pub tattoo: TattooConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every path not claimed by another route
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_tattoo_path")]
    pub tattoo_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_static_dir() -> String {
    "html".to_string()
}

fn default_ws_path() -> String {
    "/echo1".to_string()
}

fn default_tattoo_path() -> String {
    "/knux".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            ws_path: default_ws_path(),
            tattoo_path: default_tattoo_path(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Standard config file locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("knuxhub").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/knuxhub/config.toml"));
        paths.push(PathBuf::from("./config.toml"));
        paths
    }

    /// First existing file among `paths`
    pub fn find(paths: &[PathBuf]) -> Option<PathBuf> {
        paths.iter().find(|p| p.exists()).cloned()
    }

    /// Load from the first default location that exists, or from the
    /// environment alone when there is none
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_first(&Self::search_paths())
    }

    /// Load the first existing file among `paths`
    ///
    /// A file that exists but cannot be read or parsed is an error; only a
    /// missing file falls back to defaults.
    pub fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match Self::find(paths) {
            Some(path) => Self::load_with_env(&path),
            None => Ok(Self::from_env()),
        }
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("KNUXHUB_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("KNUXHUB_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = var("KNUXHUB_STATIC_DIR") {
            self.server.static_dir = dir;
        }

        // Chat overrides
        if let Some(host) = var("KNUXHUB_IRC_HOST") {
            self.chat.host = host;
        }
        if let Some(port) = var("KNUXHUB_IRC_PORT").and_then(|p| p.parse().ok()) {
            self.chat.port = port;
        }
        if let Some(nick) = var("KNUXHUB_IRC_NICK") {
            self.chat.nickname = nick;
        }
        if let Some(password) = var("KNUXHUB_IRC_PASSWORD") {
            self.chat.password = Some(password);
        }
        if let Some(channel) = var("KNUXHUB_IRC_CHANNEL") {
            self.chat.channel = channel;
        }

        // Button overrides
        if let Some(device) = var("KNUXHUB_SERIAL_DEVICE") {
            self.button.device = device;
        }
        if let Some(baud) = var("KNUXHUB_SERIAL_BAUD").and_then(|b| b.parse().ok()) {
            self.button.baud_rate = baud;
        }

        // Logging overrides
        if let Some(level) = var("KNUXHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("KNUXHUB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r##"# Knuxhub Configuration
#
# Environment variables override these settings:
# - KNUXHUB_HOST, KNUXHUB_PORT, KNUXHUB_STATIC_DIR
# - KNUXHUB_IRC_HOST, KNUXHUB_IRC_PORT, KNUXHUB_IRC_NICK,
#   KNUXHUB_IRC_PASSWORD, KNUXHUB_IRC_CHANNEL
# - KNUXHUB_SERIAL_DEVICE, KNUXHUB_SERIAL_BAUD
# - KNUXHUB_LOG_LEVEL, KNUXHUB_LOG_FORMAT

[server]
host = "0.0.0.0"
port = 9000

# Static files served for every other path
static_dir = "html"

# WebSocket endpoint for subscribers
ws_path = "/echo1"

# Tattoo image endpoint (?t=TEXT)
tattoo_path = "/knux"

[hub]
# Encode each message once and share it across subscribers
prepared = true

# Frame format: text (content only) or json ({"type":"broadcast","content":...})
wire_format = "text"

max_subscribers = 1000

# Frames buffered per subscriber before it is dropped as too slow
subscriber_queue = 64

[ticker]
enabled = true
interval_secs = 10

[chat]
enabled = true
host = "irc.chat.twitch.tv"
port = 6697
tls = true

# Bot credentials; the chat bridge stays off until nickname is set
nickname = ""
# password = "oauth:..."

channel = "#kapellosaur"

# Label prefixed to forwarded lines
tag = "KNUK TATS"

# Reconnect backoff (doubles per failure up to the max)
reconnect_initial_ms = 1000
reconnect_max_ms = 60000

[button]
enabled = true
device = "/dev/ttyACM1"
baud_rate = 115200
message = "KNUK TATS: push butn"
ack = "FLASH"

[tattoo]
template = "knuckles.png"
font = "xband-ro.ttf"
default_text = "KNUK TATS"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"##
    .to_string()
}
