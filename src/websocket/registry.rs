//! Subscriber Registry
//!
//! Tracks the subscribers currently connected to the hub. Broadcasts iterate
//! over an owned snapshot, so registrations and removals that happen while a
//! broadcast is in flight never touch the sequence being iterated.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::messages::Frame;

/// Unique identifier for a subscriber connection
pub type SubscriberId = String;

/// One live outbound connection
pub trait Subscriber: Send + Sync {
    /// Identity used for registry membership
    fn id(&self) -> &str;

    /// Remote address, for logging
    fn peer(&self) -> &str;

    /// Hand a frame to the connection without waiting on the network
    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError>;
}

/// Why a frame could not be handed to a subscriber
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Subscriber queue is full")]
    QueueFull,

    #[error("Subscriber connection is closed")]
    Closed,
}

/// Result of a bounded registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// A subscriber with the same id is already registered
    Duplicate,
    /// The registry is at its limit
    Full,
}

/// Set of connected subscribers, kept in registration order
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    ///
    /// Returns false (and leaves the registry untouched) if a subscriber with
    /// the same id is already present.
    pub async fn register(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        self.register_bounded(subscriber, usize::MAX).await == Registration::Added
    }

    /// Add a subscriber unless `limit` members are already registered
    ///
    /// The limit check and the insert happen under one write lock.
    pub async fn register_bounded(
        &self,
        subscriber: Arc<dyn Subscriber>,
        limit: usize,
    ) -> Registration {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.iter().any(|s| s.id() == subscriber.id()) {
            return Registration::Duplicate;
        }
        if subscribers.len() >= limit {
            return Registration::Full;
        }

        tracing::info!(
            connection_id = %subscriber.id(),
            peer = %subscriber.peer(),
            "Registered subscriber"
        );
        subscribers.push(subscriber);
        Registration::Added
    }

    /// Remove a subscriber by id; returns whether one was removed
    pub async fn unregister(&self, id: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.iter().position(|s| s.id() == id) {
            Some(index) => {
                let removed = subscribers.remove(index);
                tracing::info!(
                    connection_id = %id,
                    peer = %removed.peer(),
                    "Unregistered subscriber"
                );
                true
            }
            None => false,
        }
    }

    /// Owned copy of the current members
    pub async fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        self.subscribers.read().await.clone()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.subscribers.read().await.iter().any(|s| s.id() == id)
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Drop every subscriber, returning how many were removed
    pub async fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let count = subscribers.len();
        subscribers.clear();
        count
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Subscriber that records every frame it is given
    pub(crate) struct RecordingSubscriber {
        id: String,
        fail: bool,
        pub(crate) frames: Mutex<Vec<Frame>>,
    }

    impl RecordingSubscriber {
        pub(crate) fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail: false,
                frames: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail: true,
                frames: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn received(&self) -> Vec<String> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .map(|f| f.to_string())
                .collect()
        }
    }

    impl Subscriber for RecordingSubscriber {
        fn id(&self) -> &str {
            &self.id
        }

        fn peer(&self) -> &str {
            "127.0.0.1:0"
        }

        fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
            self.frames.lock().unwrap().push(frame);
            if self.fail {
                Err(DeliveryError::Closed)
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let sub = RecordingSubscriber::new("a");

        assert!(registry.register(sub.clone()).await);
        assert!(!registry.register(sub.clone()).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_bounded() {
        let registry = SubscriberRegistry::new();

        assert_eq!(
            registry.register_bounded(RecordingSubscriber::new("a"), 2).await,
            Registration::Added
        );
        assert_eq!(
            registry.register_bounded(RecordingSubscriber::new("a"), 2).await,
            Registration::Duplicate
        );
        assert_eq!(
            registry.register_bounded(RecordingSubscriber::new("b"), 2).await,
            Registration::Added
        );
        assert_eq!(
            registry.register_bounded(RecordingSubscriber::new("c"), 2).await,
            Registration::Full
        );
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = SubscriberRegistry::new();
        registry.register(RecordingSubscriber::new("a")).await;

        assert!(registry.unregister("a").await);
        assert!(!registry.unregister("a").await);
        assert!(!registry.unregister("never-registered").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_membership_matches_replayed_set() {
        let registry = SubscriberRegistry::new();
        let mut expected = BTreeSet::new();

        let ops: &[(bool, &str)] = &[
            (true, "a"),
            (true, "b"),
            (true, "a"),
            (false, "c"),
            (false, "a"),
            (true, "c"),
            (false, "a"),
            (true, "a"),
            (false, "b"),
        ];

        for (add, id) in ops {
            if *add {
                registry.register(RecordingSubscriber::new(id)).await;
                expected.insert(id.to_string());
            } else {
                registry.unregister(id).await;
                expected.remove(*id);
            }
        }

        let actual: BTreeSet<String> = registry
            .snapshot()
            .await
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = SubscriberRegistry::new();
        registry.register(RecordingSubscriber::new("a")).await;
        registry.register(RecordingSubscriber::new("b")).await;

        let snapshot = registry.snapshot().await;
        registry.unregister("a").await;
        registry.register(RecordingSubscriber::new("c")).await;

        let ids: Vec<_> = snapshot.iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(registry.contains("c").await);
        assert!(!registry.contains("a").await);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = SubscriberRegistry::new();
        registry.register(RecordingSubscriber::new("a")).await;
        registry.register(RecordingSubscriber::new("b")).await;

        assert_eq!(registry.clear().await, 2);
        assert!(registry.is_empty().await);
    }
}
