//! Postgres-backed store
//!
//! One generic implementation covers every table: entities describe their
//! columns and bind their own values, and the store assembles the statement
//! with `QueryBuilder`. Every mutation uses `RETURNING *`, so callers always
//! get the row as persisted.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Entity, EntityStore, Result, StoreError, TradingStore};
use crate::db::Db;

/// Column list separator handed to entities when they bind values
pub type Columns<'qb, 'args> = Separated<'qb, 'args, Postgres, &'static str>;

/// An entity that knows how to bind itself into SQL.
pub trait PgEntity: Entity + for<'r> FromRow<'r, PgRow> {
    /// Columns written on insert, in the order `push_values` binds them.
    const COLUMNS: &'static [&'static str];

    fn push_values(&self, values: &mut Columns<'_, '_>);

    /// Push `column = $n` assignments for every editable column.
    fn push_changes(changes: Self::Changes, assignments: &mut Columns<'_, '_>);
}

/// Store over a shared sqlx pool
#[derive(Clone)]
pub struct PgStore {
    pool: Db,
}

impl PgStore {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }
}

fn classify(err: sqlx::Error, kind: &'static str, id: Uuid) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict { kind, id }
        }
        _ => StoreError::Database(err),
    }
}

/// `INSERT INTO <table> (<columns>) VALUES ($1, ..) RETURNING *`
fn insert_query<E: PgEntity>(record: &E) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("INSERT INTO ");
    query
        .push(E::TABLE)
        .push(" (")
        .push(E::COLUMNS.join(", "))
        .push(") VALUES (");
    {
        let mut values = query.separated(", ");
        record.push_values(&mut values);
    }
    query.push(") RETURNING *");
    query
}

/// `UPDATE <table> SET <column> = $n, .. WHERE id = $m RETURNING *`
fn update_query<E: PgEntity>(id: Uuid, changes: E::Changes) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE ");
    query.push(E::TABLE).push(" SET ");
    {
        let mut assignments = query.separated(", ");
        E::push_changes(changes, &mut assignments);
    }
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    query
}

#[async_trait]
impl<E: PgEntity> EntityStore<E> for PgStore {
    async fn insert(&self, record: E) -> Result<E> {
        let id = record.id();
        let mut query = insert_query(&record);

        query
            .build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, E::KIND, id))
    }

    async fn update(&self, id: Uuid, changes: E::Changes) -> Result<E> {
        let mut query = update_query::<E>(id, changes);

        query
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { kind: E::KIND, id })
    }

    async fn delete(&self, id: Uuid) -> Result<E> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING *", E::TABLE);
        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { kind: E::KIND, id })
    }

    async fn get(&self, id: Uuid) -> Result<E> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { kind: E::KIND, id })
    }

    async fn list(&self) -> Result<Vec<E>> {
        let sql = format!("SELECT * FROM {}", E::TABLE);
        Ok(sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl TradingStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
