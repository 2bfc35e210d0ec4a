//! Kafka-compatible event bus (Kafka, Redpanda)

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info, warn};

use super::bus::{EventBus, EventBusError};

/// How long shutdown waits for buffered messages to drain
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Producer-side bus over an rdkafka `FutureProducer`.
#[derive(Clone)]
pub struct KafkaEventBus {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaEventBus {
    pub fn new(brokers: &str, client_id: &str, send_timeout: Duration) -> Result<Self, EventBusError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .set("acks", "1")
            .create()
            .map_err(|e| EventBusError::Unavailable(format!("Failed to create producer: {e}")))?;

        info!(brokers = %brokers, client_id = %client_id, "Kafka producer created");

        Ok(Self {
            producer,
            send_timeout,
        })
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), EventBusError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());

        match self.producer.send(record, Timeout::After(self.send_timeout)).await {
            Ok((partition, offset)) => {
                debug!(topic = %topic, partition, offset, "Message delivered");
                Ok(())
            }
            Err((kafka_error, _)) => Err(EventBusError::PublishFailed {
                topic: topic.to_string(),
                reason: kafka_error.to_string(),
            }),
        }
    }

    async fn flush(&self) {
        let producer = self.producer.clone();
        let result = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT))).await;

        match result {
            Ok(Ok(())) => info!("Kafka producer flushed"),
            Ok(Err(e)) => warn!(error = %e, "Kafka producer flush incomplete"),
            Err(e) => warn!(error = %e, "Kafka flush task failed"),
        }
    }

    fn name(&self) -> &str {
        "kafka"
    }
}

/// Create a consumer in `group_id` subscribed to `topics`.
///
/// Offsets are committed by the caller once a message has been applied,
/// so a crash redelivers rather than skips.
pub fn subscribe(brokers: &str, group_id: &str, topics: &[&str]) -> Result<StreamConsumer, EventBusError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false")
        .create()
        .map_err(|e| EventBusError::Unavailable(format!("Failed to create consumer: {e}")))?;

    consumer
        .subscribe(topics)
        .map_err(|e| EventBusError::Unavailable(format!("Failed to subscribe to {topics:?}: {e}")))?;

    info!(topics = ?topics, group_id = %group_id, "Subscribed to topics");
    Ok(consumer)
}
