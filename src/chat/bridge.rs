//! Chat Bridge
//!
//! Keeps a connection to the chat server alive, reconnecting with
//! exponential backoff, and forwards accepted channel lines into the hub.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use super::irc::IrcMessage;
use super::session::{ChatSession, SessionAction};
use super::{ChatConfig, ChatError};
use crate::lines::LineCodec;
use crate::websocket::BroadcastHub;

/// Longest line accepted from the server
const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Shortest reconnect delay, whatever the configuration says
const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// Byte stream to a chat server
pub trait ChatStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ChatStream for T {}

/// Opens connections to the chat server
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ChatStream>, ChatError>;
}

/// TCP connector, optionally wrapped in TLS
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    pub tls: bool,
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> Result<Box<dyn ChatStream>, ChatError> {
        let tcp = TcpStream::connect((host, port)).await?;
        if !self.tls {
            return Ok(Box::new(tcp));
        }

        let connector = tokio_native_tls::native_tls::TlsConnector::new()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let stream = connector.connect(host, tcp).await?;
        Ok(Box::new(stream))
    }
}

/// Reconnect delay that doubles up to a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(MIN_BACKOFF);
        let initial = initial.clamp(MIN_BACKOFF, max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; doubles the delay for next time
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Disconnected,
}

type ChatFramed = Framed<Box<dyn ChatStream>, LineCodec>;

/// Bridge from one chat channel into the broadcast hub
pub struct ChatBridge {
    hub: Arc<BroadcastHub>,
    config: ChatConfig,
    connector: Arc<dyn Connector>,
}

impl ChatBridge {
    pub fn new(hub: Arc<BroadcastHub>, config: ChatConfig) -> Self {
        let connector = Arc::new(TcpConnector { tls: config.tls });
        Self::with_connector(hub, config, connector)
    }

    pub fn with_connector(
        hub: Arc<BroadcastHub>,
        config: ChatConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            hub,
            config,
            connector,
        }
    }

    /// Connect, and keep reconnecting, until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_initial_ms),
            Duration::from_millis(self.config.reconnect_max_ms),
        );

        loop {
            match self.session(&shutdown, &mut backoff).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Disconnected) => {
                    tracing::info!(
                        disconnected_at = %chrono::Utc::now(),
                        "Disconnected from chat server"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        host = %self.config.host,
                        port = self.config.port,
                        error = %e,
                        "Chat connection failed"
                    );
                }
            }

            let delay = backoff.next_delay();
            tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnecting to chat server");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Chat bridge stopped");
    }

    /// Start the bridge background task
    pub fn start(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn session(
        &self,
        shutdown: &CancellationToken,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd, ChatError> {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
            stream = self.connector.connect(&self.config.host, self.config.port) => stream?,
        };

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            connected_at = %chrono::Utc::now(),
            "Connected to chat server"
        );

        let codec = LineCodec::new(b"\n", b"\r\n", MAX_LINE_LENGTH);
        let mut framed: ChatFramed = Framed::new(stream, codec);
        let mut session = ChatSession::new(&self.config);

        for line in session.registration() {
            framed.send(line).await?;
        }

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = framed.send("QUIT :shutting down").await;
                    return Ok(SessionEnd::Shutdown);
                }
                next = framed.next() => next,
            };

            let chunk = match next {
                None => return Ok(SessionEnd::Disconnected),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(chunk)) => chunk,
            };

            let line = String::from_utf8_lossy(&chunk);
            let Some(msg) = IrcMessage::parse(&line) else {
                tracing::debug!(line = %line, "Dropping unparseable chat line");
                continue;
            };

            for action in session.handle(&msg) {
                match action {
                    SessionAction::Send(reply) => framed.send(reply).await?,
                    SessionAction::Forward(text) => {
                        self.hub.broadcast(text).await;
                    }
                    SessionAction::Registered => backoff.reset(),
                }
            }
        }
    }
}
