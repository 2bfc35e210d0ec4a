//! Change events emitted after entity mutations
//!
//! Every successful create, update or delete is followed by one publish
//! attempt of a [`ChangeEvent`] on the entity's topic. Publishing happens
//! after the store has committed and outside any transaction; a lost event
//! is logged by [`MutationNotifier`] and never reaches the caller.

pub mod bus;
pub mod kafka;
pub mod notifier;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use bus::{EventBus, EventBusError, InMemoryEventBus, PublishedMessage};
pub use kafka::KafkaEventBus;
pub use notifier::{EventPublishError, MutationNotifier};

/// Kind of committed mutation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Created => "created",
            Operation::Updated => "updated",
            Operation::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Operation::Created),
            "updated" => Some(Operation::Updated),
            "deleted" => Some(Operation::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format: `{"event_type": "agent.created", "timestamp": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: String,
    /// Set when the event is built, i.e. at publish time
    pub timestamp: DateTime<Utc>,
    /// Post-mutation snapshot of the entity
    pub data: Value,
}

impl ChangeEvent {
    pub fn new(entity_kind: &str, operation: Operation, data: Value) -> Self {
        Self {
            event_type: event_type(entity_kind, operation),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    /// Split `event_type` into entity kind and operation.
    pub fn kind_and_operation(&self) -> Option<(&str, Operation)> {
        let (kind, operation) = self.event_type.split_once('.')?;
        Some((kind, Operation::parse(operation)?))
    }

    /// `data.id`, if the snapshot carries one
    pub fn entity_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }
}

pub fn event_type(entity_kind: &str, operation: Operation) -> String {
    format!("{}.{}", entity_kind, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_format() {
        assert_eq!(event_type("agent", Operation::Created), "agent.created");
        assert_eq!(event_type("swarm", Operation::Deleted), "swarm.deleted");
    }

    #[test]
    fn test_payload_shape() {
        let event = ChangeEvent::new("agent", Operation::Updated, json!({"id": "a1", "status": "paused"}));
        let payload: Value = serde_json::from_slice(&event.to_payload().unwrap()).unwrap();

        assert_eq!(payload["event_type"], "agent.updated");
        assert_eq!(payload["data"]["status"], "paused");
        // RFC 3339 timestamp
        let ts = payload["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_kind_and_operation() {
        let event = ChangeEvent::new("agent", Operation::Deleted, json!({"id": "a1"}));
        assert_eq!(event.kind_and_operation(), Some(("agent", Operation::Deleted)));
        assert_eq!(event.entity_id(), Some("a1"));

        let bogus = ChangeEvent {
            event_type: "agent.archived".to_string(),
            timestamp: Utc::now(),
            data: json!({}),
        };
        assert_eq!(bogus.kind_and_operation(), None);
    }
}
