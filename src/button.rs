//! Button Bridge
//!
//! Listens to a push-button board on a serial port. Every line the board
//! sends is one press: the bridge broadcasts a fixed message, then tells the
//! board to flash its light.
//!
//! A missing device is not an error for the process. The bridge logs it
//! once and the rest of the hub carries on without a button.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{AnyDelimiterCodecError, Framed};
use tokio_util::sync::CancellationToken;

use crate::lines::LineCodec;
use crate::websocket::BroadcastHub;

/// Longest line accepted from the device
const MAX_LINE_LENGTH: usize = 1024;

/// Button bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Broadcast on every press
    #[serde(default = "default_message")]
    pub message: String,

    /// Line written back to the device after each press
    #[serde(default = "default_ack")]
    pub ack: String,
}

fn default_enabled() -> bool {
    true
}

fn default_device() -> String {
    "/dev/ttyACM1".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_message() -> String {
    "KNUK TATS: push butn".to_string()
}

fn default_ack() -> String {
    "FLASH".to_string()
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device: default_device(),
            baud_rate: default_baud_rate(),
            message: default_message(),
            ack: default_ack(),
        }
    }
}

/// Bridge from a serial push-button into the broadcast hub
pub struct ButtonBridge {
    hub: Arc<BroadcastHub>,
    config: ButtonConfig,
}

impl ButtonBridge {
    pub fn new(hub: Arc<BroadcastHub>, config: ButtonConfig) -> Self {
        Self { hub, config }
    }

    /// Open the configured serial device
    pub fn open(&self) -> Result<SerialStream, ButtonError> {
        tokio_serial::new(&self.config.device, self.config.baud_rate)
            .open_native_async()
            .map_err(|e| ButtonError::Open {
                device: self.config.device.clone(),
                error: e.to_string(),
            })
    }

    /// Open the device and serve it until shutdown or a device error
    pub async fn run(self, shutdown: CancellationToken) {
        let port = match self.open() {
            Ok(port) => port,
            Err(e) => {
                tracing::warn!(error = %e, "Button device unavailable, continuing without it");
                return;
            }
        };

        tracing::info!(
            device = %self.config.device,
            baud_rate = self.config.baud_rate,
            "Serial port connected"
        );

        if let Err(e) = self.serve(port, &shutdown).await {
            tracing::warn!(
                device = %self.config.device,
                error = %e,
                "Button device failed, bridge disabled"
            );
        }
    }

    /// Start the bridge background task
    pub fn start(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Handle presses arriving on an already open connection
    pub async fn serve<S>(&self, stream: S, shutdown: &CancellationToken) -> Result<(), ButtonError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, LineCodec::new(b"\n", b"\n", MAX_LINE_LENGTH));

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = framed.next() => next,
            };

            let chunk = match next {
                None => {
                    tracing::info!(device = %self.config.device, "Serial port closed");
                    return Ok(());
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(chunk)) => chunk,
            };

            let Ok(line) = std::str::from_utf8(&chunk) else {
                tracing::debug!(bytes = chunk.len(), "Dropping non-UTF-8 serial line");
                continue;
            };
            tracing::debug!(line = %line.trim_end_matches('\r'), "Button line received");

            self.hub.broadcast(self.config.message.as_str()).await;

            tracing::debug!(line = %self.config.ack, "Sending line to button");
            framed.send(self.config.ack.as_str()).await?;
        }
    }
}

/// Button bridge errors
#[derive(Debug, Error)]
pub enum ButtonError {
    #[error("Failed to open serial device {device}: {error}")]
    Open { device: String, error: String },

    #[error("Serial I/O error: {0}")]
    Io(#[from] AnyDelimiterCodecError),
}
