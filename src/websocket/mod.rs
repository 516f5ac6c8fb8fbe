//! WebSocket Broadcast Hub
//!
//! Fans events from the hub's sources out to every connected WebSocket
//! client.
//!
//! ## Architecture
//!
//! - **SubscriberRegistry**: Tracks connected subscribers
//! - **BroadcastHub**: Owns the registry and delivers each message to every subscriber
//! - **Handler**: Handles WebSocket upgrade and the per-connection reader/writer tasks
//! - **Messages**: Broadcast message and wire formats
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:9000/echo1');
//!
//! ws.onmessage = (event) => {
//!   console.log('Received:', event.data); // "tick 3 from server"
//! };
//!
//! ws.send('hello'); // everyone receives "hello from <your address>"
//! ```

mod handler;
mod hub;
mod messages;
mod registry;

pub use handler::{websocket_handler, WsSubscriber};
pub use hub::{BroadcastHub, BroadcastReport, HubConfig, HubError, SessionHandler};
pub use messages::{Frame, Message, ServerMessage, WireFormat};
pub use registry::{DeliveryError, Registration, Subscriber, SubscriberId, SubscriberRegistry};
