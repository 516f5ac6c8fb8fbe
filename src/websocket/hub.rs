//! Broadcast Hub
//!
//! Owns the subscriber registry and fans every message out to the
//! subscribers registered when the broadcast starts.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use super::messages::{Message, WireFormat};
use super::registry::{Registration, Subscriber, SubscriberId, SubscriberRegistry};

/// Fans messages out to all connected subscribers
pub struct BroadcastHub {
    registry: SubscriberRegistry,
    config: HubConfig,
}

/// Configuration for the broadcast hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Encode each message once and share the frame across subscribers
    #[serde(default = "default_prepared")]
    pub prepared: bool,
    /// Frame format sent to subscribers
    #[serde(default)]
    pub wire_format: WireFormat,
    /// Maximum number of concurrent subscribers
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,
    /// Frames buffered per subscriber before it counts as too slow
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,
}

fn default_prepared() -> bool {
    true
}

fn default_max_subscribers() -> usize {
    1000
}

fn default_subscriber_queue() -> usize {
    64
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            prepared: default_prepared(),
            wire_format: WireFormat::default(),
            max_subscribers: default_max_subscribers(),
            subscriber_queue: default_subscriber_queue(),
        }
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Connection lifecycle callbacks a transport adapter drives
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// A connection finished its handshake
    async fn on_open(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), HubError>;

    /// A connection sent a text frame
    async fn on_message(&self, id: &str, peer: &str, text: &str);

    /// A connection went away
    async fn on_close(&self, id: &str);
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a subscriber, enforcing the subscriber limit
    pub async fn on_connect(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), HubError> {
        let limit = self.config.max_subscribers;
        match self.registry.register_bounded(subscriber, limit).await {
            Registration::Full => Err(HubError::TooManySubscribers(limit)),
            Registration::Added | Registration::Duplicate => Ok(()),
        }
    }

    pub async fn on_disconnect(&self, id: &str) {
        self.registry.unregister(id).await;
    }

    /// Deliver a message to every currently registered subscriber
    ///
    /// Subscribers that fail delivery are unregistered before this returns;
    /// the remaining subscribers still receive the message.
    pub async fn broadcast(&self, message: impl Into<Message>) -> BroadcastReport {
        let message = message.into();
        let subscribers = self.registry.snapshot().await;
        let mut report = BroadcastReport::default();
        let mut failed: Vec<SubscriberId> = Vec::new();

        tracing::debug!(
            message = %message,
            subscribers = subscribers.len(),
            prepared = self.config.prepared,
            "Broadcasting message"
        );

        for subscriber in &subscribers {
            let frame = if self.config.prepared {
                message.prepared(self.config.wire_format)
            } else {
                self.config.wire_format.encode(message.content())
            };

            match subscriber.deliver(frame) {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::trace!(connection_id = %subscriber.id(), "Message delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        connection_id = %subscriber.id(),
                        peer = %subscriber.peer(),
                        error = %e,
                        "Delivery failed, dropping subscriber"
                    );
                    failed.push(subscriber.id().to_string());
                }
            }
        }

        for id in failed {
            self.registry.unregister(&id).await;
        }

        report
    }

    /// Relay a subscriber's text frame to everyone
    pub async fn relay(&self, peer: &str, text: &str) -> BroadcastReport {
        self.broadcast(format!("{} from {}", text, peer)).await
    }

    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn is_registered(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    /// Drop all subscribers, closing their outbound channels
    pub async fn shutdown(&self) {
        let count = self.registry.clear().await;
        tracing::info!(subscribers = count, "Broadcast hub shut down");
    }
}

#[async_trait]
impl SessionHandler for BroadcastHub {
    async fn on_open(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), HubError> {
        self.on_connect(subscriber).await
    }

    async fn on_message(&self, id: &str, peer: &str, text: &str) {
        tracing::debug!(connection_id = %id, text = %text, "Subscriber message");
        self.relay(peer, text).await;
    }

    async fn on_close(&self, id: &str) {
        self.on_disconnect(id).await;
    }
}

/// Errors that can occur in the broadcast hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many subscribers (limit: {0})")]
    TooManySubscribers(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::registry::tests::RecordingSubscriber;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert!(config.prepared);
        assert_eq!(config.wire_format, WireFormat::Text);
        assert_eq!(config.max_subscribers, 1000);
        assert_eq!(config.subscriber_queue, 64);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let hub = hub();
        let subs: Vec<_> = (0..3)
            .map(|i| RecordingSubscriber::new(&format!("sub-{}", i)))
            .collect();
        for sub in &subs {
            hub.on_connect(sub.clone()).await.unwrap();
        }

        let report = hub.broadcast("tick 1 from server").await;

        assert_eq!(report, BroadcastReport { delivered: 3, failed: 0 });
        for sub in &subs {
            assert_eq!(sub.received(), vec!["tick 1 from server"]);
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_unregisters_only_that_subscriber() {
        let hub = hub();
        let good_a = RecordingSubscriber::new("a");
        let bad = RecordingSubscriber::failing("bad");
        let good_b = RecordingSubscriber::new("b");

        hub.on_connect(good_a.clone()).await.unwrap();
        hub.on_connect(bad.clone()).await.unwrap();
        hub.on_connect(good_b.clone()).await.unwrap();

        let report = hub.broadcast("hello").await;

        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert!(!hub.is_registered("bad").await);
        assert!(hub.is_registered("a").await);
        assert!(hub.is_registered("b").await);
        assert_eq!(good_a.received(), vec!["hello"]);
        assert_eq!(good_b.received(), vec!["hello"]);

        // The dropped subscriber is not tried again
        hub.broadcast("again").await;
        assert_eq!(bad.received(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_late_joiner_misses_earlier_broadcast() {
        let hub = hub();
        let early = RecordingSubscriber::new("early");
        hub.on_connect(early.clone()).await.unwrap();
        hub.broadcast("first").await;

        let late = RecordingSubscriber::new("late");
        hub.on_connect(late.clone()).await.unwrap();
        hub.broadcast("second").await;

        assert_eq!(early.received(), vec!["first", "second"]);
        assert_eq!(late.received(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_prepared_and_unprepared_are_equivalent() {
        for prepared in [true, false] {
            let hub = BroadcastHub::new(HubConfig {
                prepared,
                wire_format: WireFormat::Json,
                ..HubConfig::default()
            });
            let a = RecordingSubscriber::new("a");
            let b = RecordingSubscriber::new("b");
            hub.on_connect(a.clone()).await.unwrap();
            hub.on_connect(b.clone()).await.unwrap();

            hub.broadcast("KNUK TATS: push butn").await;

            let expected = r#"{"type":"broadcast","content":"KNUK TATS: push butn"}"#;
            assert_eq!(a.received(), vec![expected]);
            assert_eq!(b.received(), vec![expected]);

            let shared = Arc::ptr_eq(&a.frames.lock().unwrap()[0], &b.frames.lock().unwrap()[0]);
            assert_eq!(shared, prepared);
        }
    }

    #[tokio::test]
    async fn test_broadcast_order_per_source() {
        let hub = hub();
        let sub = RecordingSubscriber::new("a");
        hub.on_connect(sub.clone()).await.unwrap();

        for n in 1..=5 {
            hub.broadcast(format!("tick {} from server", n)).await;
        }

        let expected: Vec<String> = (1..=5).map(|n| format!("tick {} from server", n)).collect();
        assert_eq!(sub.received(), expected);
    }

    #[tokio::test]
    async fn test_subscriber_limit() {
        let hub = BroadcastHub::new(HubConfig {
            max_subscribers: 2,
            ..HubConfig::default()
        });

        hub.on_connect(RecordingSubscriber::new("a")).await.unwrap();
        hub.on_connect(RecordingSubscriber::new("b")).await.unwrap();
        let result = hub.on_connect(RecordingSubscriber::new("c")).await;

        assert!(matches!(result, Err(HubError::TooManySubscribers(2))));
        assert_eq!(hub.subscriber_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscriber_limit_under_concurrent_connects() {
        let hub = Arc::new(BroadcastHub::new(HubConfig {
            max_subscribers: 5,
            ..HubConfig::default()
        }));

        let connects: Vec<_> = (0..50)
            .map(|n| {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    hub.on_connect(RecordingSubscriber::new(&format!("sub-{}", n)))
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut accepted = 0;
        for connect in connects {
            if connect.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(hub.subscriber_count().await, 5);
    }

    #[tokio::test]
    async fn test_session_handler_relays_text() {
        let hub = hub();
        let sub = RecordingSubscriber::new("a");
        hub.on_open(sub.clone()).await.unwrap();

        hub.on_message("a", "10.0.0.7:51234", "hi there").await;
        assert_eq!(sub.received(), vec!["hi there from 10.0.0.7:51234"]);

        hub.on_close("a").await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_drops_everyone() {
        let hub = hub();
        hub.on_connect(RecordingSubscriber::new("a")).await.unwrap();
        hub.on_connect(RecordingSubscriber::new("b")).await.unwrap();

        hub.shutdown().await;
        assert_eq!(hub.subscriber_count().await, 0);
        assert_eq!(hub.broadcast("nobody").await, BroadcastReport::default());
    }
}
