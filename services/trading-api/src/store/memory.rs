//! In-process store keeping each table as a list of JSON rows.
//!
//! Used by the test suite and by `STORE_BACKEND=memory` for local runs.
//! Rows are plain column → value mappings, so records go through the same
//! serde representation the API exposes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::ser::Error as _;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Entity, EntityStore, Result, StoreError, TradingStore};

type Row = Map<String, Value>;

/// In-memory tables keyed by table name
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Vec<Row>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`
    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(Vec::len).unwrap_or(0)
    }
}

fn to_row<E: Entity>(record: &E) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        _ => Err(serde_json::Error::custom(format!(
            "{} did not serialize to a row",
            E::KIND
        ))
        .into()),
    }
}

fn from_row<E: Entity>(row: &Row) -> Result<E> {
    Ok(serde_json::from_value(Value::Object(row.clone()))?)
}

fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
}

fn position(rows: &[Row], id: Uuid) -> Option<usize> {
    rows.iter().position(|row| row_id(row) == Some(id))
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore {
    async fn insert(&self, record: E) -> Result<E> {
        let id = record.id();
        let row = to_row(&record)?;

        let mut tables = self.tables.write().await;
        let rows = tables.entry(E::TABLE).or_default();
        if position(rows, id).is_some() {
            return Err(StoreError::Conflict { kind: E::KIND, id });
        }
        let stored = from_row(&row)?;
        rows.push(row);
        Ok(stored)
    }

    async fn update(&self, id: Uuid, changes: E::Changes) -> Result<E> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(E::TABLE).or_default();
        let index = position(rows, id).ok_or(StoreError::NotFound { kind: E::KIND, id })?;

        let mut record: E = from_row(&rows[index])?;
        record.apply(changes);
        rows[index] = to_row(&record)?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<E> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(E::TABLE).or_default();
        let index = position(rows, id).ok_or(StoreError::NotFound { kind: E::KIND, id })?;

        let row = rows.remove(index);
        from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<E> {
        let tables = self.tables.read().await;
        tables
            .get(E::TABLE)
            .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)))
            .ok_or(StoreError::NotFound { kind: E::KIND, id })
            .and_then(from_row)
    }

    async fn list(&self) -> Result<Vec<E>> {
        let tables = self.tables.read().await;
        match tables.get(E::TABLE) {
            Some(rows) => rows.iter().map(from_row).collect(),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl TradingStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
