//! Post-commit, fire-and-forget publishing of change events

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::bus::{EventBus, EventBusError};
use super::{event_type, ChangeEvent, Operation};
use crate::observability::{metrics, MetricsCollector};
use crate::store::Entity;

/// Why a change event was lost. Only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum EventPublishError {
    #[error("failed to serialize change event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] EventBusError),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}

/// Publishes one [`ChangeEvent`] per committed mutation.
///
/// Must only be called once the store has confirmed the mutation. Each
/// attempt runs on its own task, so dropping the caller (a client hanging
/// up mid-request) cannot cancel it. Failures (serialization, bus errors,
/// timeouts) are logged with the topic, event type and entity id and then
/// dropped: there is no retry and no dead-letter queue, and the caller's
/// response never depends on them.
#[derive(Clone)]
pub struct MutationNotifier {
    bus: Arc<dyn EventBus>,
    publish_timeout: Duration,
    metrics: MetricsCollector,
}

impl MutationNotifier {
    pub fn new(bus: Arc<dyn EventBus>, publish_timeout: Duration, metrics: MetricsCollector) -> Self {
        Self {
            bus,
            publish_timeout,
            metrics,
        }
    }

    pub fn bus_name(&self) -> &str {
        self.bus.name()
    }

    /// Publish the post-mutation state of `entity` on its topic.
    pub fn notify_entity<E: Entity>(&self, operation: Operation, entity: &E) -> JoinHandle<()> {
        match entity.event_snapshot() {
            Ok(snapshot) => self.notify(E::TOPIC, E::KIND, operation, snapshot),
            Err(e) => {
                let notifier = self.clone();
                let event_type = event_type(E::KIND, operation);
                let entity_id = entity.id().to_string();
                tokio::spawn(async move {
                    notifier
                        .record_lost(E::TOPIC, &event_type, &entity_id, &EventPublishError::from(e))
                        .await;
                })
            }
        }
    }

    /// Build `<entity_kind>.<operation>` around `snapshot` and spawn exactly
    /// one publish attempt on `topic`.
    ///
    /// Awaiting the handle is optional; the attempt completes and is
    /// accounted for either way.
    pub fn notify(&self, topic: &str, entity_kind: &str, operation: Operation, snapshot: Value) -> JoinHandle<()> {
        let event = ChangeEvent::new(entity_kind, operation, snapshot);
        let topic = topic.to_string();
        let notifier = self.clone();

        tokio::spawn(async move { notifier.attempt(&topic, event).await })
    }

    async fn attempt(&self, topic: &str, event: ChangeEvent) {
        let entity_id = event.entity_id().unwrap_or("unknown").to_string();

        match self.publish(topic, &event).await {
            Ok(()) => {
                debug!(
                    topic = %topic,
                    event_type = %event.event_type,
                    entity_id = %entity_id,
                    "Change event published"
                );
                self.metrics.increment(metrics::EVENTS_PUBLISHED, 1).await;
            }
            Err(e) => self.record_lost(topic, &event.event_type, &entity_id, &e).await,
        }
    }

    async fn publish(&self, topic: &str, event: &ChangeEvent) -> Result<(), EventPublishError> {
        let payload = event.to_payload()?;
        tokio::time::timeout(self.publish_timeout, self.bus.publish(topic, payload))
            .await
            .map_err(|_| EventPublishError::Timeout(self.publish_timeout))??;
        Ok(())
    }

    async fn record_lost(&self, topic: &str, event_type: &str, entity_id: &str, err: &EventPublishError) {
        error!(
            topic = %topic,
            event_type = %event_type,
            entity_id = %entity_id,
            error = %err,
            "Change event lost"
        );
        self.metrics.increment(metrics::EVENTS_PUBLISH_FAILED, 1).await;
    }
}
