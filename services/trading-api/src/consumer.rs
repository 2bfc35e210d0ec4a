//! Mirrors agent change events into the `agents` replica table.
//!
//! Delivery is at-least-once, so every handler is idempotent: a redelivered
//! `created` overwrites, an `updated` for a missing row inserts it, and a
//! `deleted` for a missing row is a no-op.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::FromRow;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{ChangeEvent, Operation};
use crate::models::{Agent, AgentChanges};
use crate::store::postgres::{Columns, PgEntity};
use crate::store::{Entity, EntityStore, StoreError};

/// An agent row in the consumer's replica table
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AgentReplica(pub Agent);

impl<'r> FromRow<'r, PgRow> for AgentReplica {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Agent::from_row(row).map(AgentReplica)
    }
}

impl Entity for AgentReplica {
    type Changes = AgentChanges;

    const TABLE: &'static str = "agents";
    const KIND: &'static str = Agent::KIND;
    const TOPIC: &'static str = Agent::TOPIC;

    fn id(&self) -> Uuid {
        self.0.id
    }

    fn apply(&mut self, changes: AgentChanges) {
        self.0.apply(changes);
    }
}

impl PgEntity for AgentReplica {
    const COLUMNS: &'static [&'static str] = Agent::COLUMNS;

    fn push_values(&self, values: &mut Columns<'_, '_>) {
        self.0.push_values(values);
    }

    fn push_changes(changes: AgentChanges, assignments: &mut Columns<'_, '_>) {
        Agent::push_changes(changes, assignments);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event data carries no usable id")]
    MissingId,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a single event did to the replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Updated,
    Deleted,
    AlreadyAbsent,
    /// Not an agent event, or an operation this consumer ignores
    Skipped,
}

pub struct AgentEventConsumer {
    store: Arc<dyn EntityStore<AgentReplica>>,
}

impl AgentEventConsumer {
    pub fn new(store: Arc<dyn EntityStore<AgentReplica>>) -> Self {
        Self { store }
    }

    /// Decode a raw message and apply it.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<Applied, ConsumerError> {
        let event = ChangeEvent::from_payload(payload)?;
        self.handle(&event).await
    }

    pub async fn handle(&self, event: &ChangeEvent) -> Result<Applied, ConsumerError> {
        let operation = match event.kind_and_operation() {
            Some((kind, operation)) if kind == Agent::KIND => operation,
            _ => {
                warn!(event_type = %event.event_type, "Skipping unknown event type");
                return Ok(Applied::Skipped);
            }
        };

        let applied = match operation {
            Operation::Created => self.upsert(event, true).await?,
            Operation::Updated => self.upsert(event, false).await?,
            Operation::Deleted => self.remove(event).await?,
        };

        debug!(
            event_type = %event.event_type,
            entity_id = event.entity_id().unwrap_or("unknown"),
            applied = ?applied,
            "Event applied"
        );
        Ok(applied)
    }

    /// Insert-first for `created`, update-first for `updated`; either falls
    /// back to the other.
    async fn upsert(&self, event: &ChangeEvent, insert_first: bool) -> Result<Applied, ConsumerError> {
        let agent: Agent = serde_json::from_value(event.data.clone())?;
        let id = agent.id;

        if insert_first {
            match self.store.insert(AgentReplica(agent.clone())).await {
                Ok(_) => Ok(Applied::Inserted),
                Err(StoreError::Conflict { .. }) => {
                    info!(agent_id = %id, "Agent already replicated, overwriting");
                    self.store.update(id, AgentChanges::from(&agent)).await?;
                    Ok(Applied::Updated)
                }
                Err(e) => Err(e.into()),
            }
        } else {
            match self.store.update(id, AgentChanges::from(&agent)).await {
                Ok(_) => Ok(Applied::Updated),
                Err(StoreError::NotFound { .. }) => {
                    info!(agent_id = %id, "Updated agent missing from replica, inserting");
                    self.store.insert(AgentReplica(agent)).await?;
                    Ok(Applied::Inserted)
                }
                Err(e) => Err(e.into()),
            }
        }
    }

    async fn remove(&self, event: &ChangeEvent) -> Result<Applied, ConsumerError> {
        let id = event
            .entity_id()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(ConsumerError::MissingId)?;

        match self.store.delete(id).await {
            Ok(_) => Ok(Applied::Deleted),
            Err(StoreError::NotFound { .. }) => Ok(Applied::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }
}
