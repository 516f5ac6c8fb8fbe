//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and maps hub frames onto the socket.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::hub::SessionHandler;
use super::messages::Frame;
use super::registry::{DeliveryError, Subscriber};
use crate::api::AppState;

/// A WebSocket connection as seen by the hub
///
/// Frames go into a bounded queue drained by the connection's writer task.
/// Dropping the subscriber closes the queue, which ends the writer and
/// closes the socket.
pub struct WsSubscriber {
    id: String,
    peer: String,
    sender: mpsc::Sender<Frame>,
}

impl WsSubscriber {
    pub fn new(id: String, peer: String, sender: mpsc::Sender<Frame>) -> Self {
        Self { id, peer, sender }
    }
}

impl Subscriber for WsSubscriber {
    fn id(&self) -> &str {
        &self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let handler: Arc<dyn SessionHandler> = state.hub.clone();
    let queue = state.hub.config().subscriber_queue;
    ws.on_upgrade(move |socket| handle_socket(socket, handler, peer, queue))
}

/// Handle an established WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    handler: Arc<dyn SessionHandler>,
    peer: SocketAddr,
    queue: usize,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Frame>(queue.max(1));

    let connection_id = Uuid::new_v4().to_string();
    let peer = peer.to_string();
    let subscriber = Arc::new(WsSubscriber::new(connection_id.clone(), peer.clone(), tx));

    if let Err(e) = handler.on_open(subscriber).await {
        tracing::error!(peer = %peer, error = %e, "Failed to register WebSocket connection");
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: e.to_string().into(),
            })))
            .await;
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Forward hub frames to the socket until the hub drops us
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let handler_for_recv = Arc::clone(&handler);
    let conn_id_for_recv = connection_id.clone();
    let peer_for_recv = peer.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handler_for_recv
                        .on_message(&conn_id_for_recv, &peer_for_recv, &text)
                        .await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %conn_id_for_recv, "Ignoring binary frame");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %conn_id_for_recv, "Client requested close");
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    handler.on_close(&connection_id).await;
}
