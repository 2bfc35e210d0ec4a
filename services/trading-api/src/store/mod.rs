//! Entity persistence
//!
//! Handlers talk to storage through [`EntityStore`], a single-row interface
//! implemented for every entity by both backends: Postgres ([`PgStore`]) and
//! an in-process table of JSON rows ([`MemoryStore`]).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::models::{Agent, Strategy, Swarm, User};

pub use memory::MemoryStore;
pub use postgres::{PgEntity, PgStore};

/// Store-level failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("{kind} {id} already exists")]
    Conflict { kind: &'static str, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// A persisted domain record with an immutable `id`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Replacement values for every editable column (full-replace update).
    type Changes: Send + Sync + 'static;

    const TABLE: &'static str;
    /// Singular name used in event types, e.g. `agent` in `agent.created`.
    const KIND: &'static str;
    /// Topic change events for this entity are published to.
    const TOPIC: &'static str;

    fn id(&self) -> Uuid;

    /// Overwrite editable fields in place; `id` is never touched.
    fn apply(&mut self, changes: Self::Changes);

    /// Attributes carried in the `data` field of change events.
    fn event_snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Single-row operations over one entity table.
///
/// `update`, `delete` and `get` return [`StoreError::NotFound`] when no row
/// carries the id; none of them ever index into an empty result.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn insert(&self, record: E) -> Result<E>;

    async fn update(&self, id: Uuid, changes: E::Changes) -> Result<E>;

    /// Remove the row and return it as it was before deletion.
    async fn delete(&self, id: Uuid) -> Result<E>;

    async fn get(&self, id: Uuid) -> Result<E>;

    async fn list(&self) -> Result<Vec<E>>;
}

/// Every table the API owns, behind one injected handle.
#[async_trait]
pub trait TradingStore:
    EntityStore<Agent> + EntityStore<Strategy> + EntityStore<Swarm> + EntityStore<User>
{
    /// Connectivity probe for readiness checks
    async fn ping(&self) -> Result<()>;

    /// Backend name reported by the detailed health check
    fn backend(&self) -> &'static str;
}
