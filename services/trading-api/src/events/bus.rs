//! Event bus boundary and the in-process implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ChangeEvent;

/// Publish failures reported by a bus
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("event bus unavailable: {0}")]
    Unavailable(String),
}

/// Accepts serialized events for a topic. Delivery to consumers is not
/// acknowledged back to the publisher.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), EventBusError>;

    /// Drain anything buffered; called once on shutdown.
    async fn flush(&self) {}

    fn name(&self) -> &str;
}

/// Oldest messages are dropped beyond this many
const MAX_RETAINED: usize = 10_000;

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Bus that keeps published messages in memory.
///
/// Used when no brokers are configured and throughout the tests, where it
/// can be switched to fail or stall every publish.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    messages: Arc<RwLock<VecDeque<PublishedMessage>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose every publish fails
    pub fn failing() -> Self {
        let bus = Self::new();
        bus.set_failing(true);
        bus
    }

    /// Hold each publish for `delay` before accepting it
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Publish attempts so far, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.messages.read().await.iter().cloned().collect()
    }

    /// Decoded events published on `topic`, oldest first
    pub async fn events(&self, topic: &str) -> Vec<ChangeEvent> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .filter_map(|m| ChangeEvent::from_payload(&m.payload).ok())
            .collect()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), EventBusError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(EventBusError::Unavailable("in-memory bus set to fail".to_string()));
        }

        let mut messages = self.messages.write().await;
        if messages.len() >= MAX_RETAINED {
            messages.pop_front();
        }
        messages.push_back(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
