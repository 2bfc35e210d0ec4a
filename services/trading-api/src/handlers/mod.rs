//! Request handlers
//!
//! Every mutating handler follows the same path: validate ([`ValidJson`]),
//! mutate through the store, then hand the committed row to the notifier. A
//! store error returns early, so no event is ever built for a mutation that
//! did not happen. The notifier never fails, so the response depends only on
//! the store result.

pub mod agents;
pub mod strategies;
pub mod swarms;
pub mod users;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::{capitalize, ApiError};
use crate::events::Operation;
use crate::models::{DeleteResponse, WelcomeResponse};
use crate::observability::metrics;
use crate::store::{Entity, EntityStore, TradingStore};
use crate::AppState;

/// JSON body that has been deserialized and validated.
///
/// Both kinds of rejection come back as [`ApiError`], so every 4xx carries
/// the same `{"detail": ...}` body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// GET /
pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Trading Bot API".to_string(),
    })
}

async fn committed<E: Entity>(state: &AppState, operation: Operation, row: &E) {
    let publish = state.notifier.notify_entity(operation, row);
    state
        .metrics
        .increment(&metrics::mutation(E::KIND, operation), 1)
        .await;

    // The attempt runs detached; waiting here only orders the response after it.
    if let Err(e) = publish.await {
        tracing::error!(kind = E::KIND, error = %e, "Publish task failed");
    }
}

pub(crate) async fn create_and_notify<E: Entity>(state: &AppState, record: E) -> Result<E, ApiError>
where
    dyn TradingStore: EntityStore<E>,
{
    let created = EntityStore::<E>::insert(state.store.as_ref(), record).await?;
    tracing::info!(kind = E::KIND, id = %created.id(), "Created");
    committed(state, Operation::Created, &created).await;
    Ok(created)
}

pub(crate) async fn update_and_notify<E: Entity>(
    state: &AppState,
    id: Uuid,
    changes: E::Changes,
) -> Result<E, ApiError>
where
    dyn TradingStore: EntityStore<E>,
{
    let updated = EntityStore::<E>::update(state.store.as_ref(), id, changes).await?;
    tracing::info!(kind = E::KIND, id = %id, "Updated");
    committed(state, Operation::Updated, &updated).await;
    Ok(updated)
}

pub(crate) async fn delete_and_notify<E: Entity>(state: &AppState, id: Uuid) -> Result<DeleteResponse, ApiError>
where
    dyn TradingStore: EntityStore<E>,
{
    let deleted = EntityStore::<E>::delete(state.store.as_ref(), id).await?;
    tracing::info!(kind = E::KIND, id = %id, "Deleted");
    committed(state, Operation::Deleted, &deleted).await;
    Ok(DeleteResponse {
        message: format!("{} deleted", capitalize(E::KIND)),
    })
}

pub(crate) async fn fetch_one<E: Entity>(state: &AppState, id: Uuid) -> Result<E, ApiError>
where
    dyn TradingStore: EntityStore<E>,
{
    Ok(EntityStore::<E>::get(state.store.as_ref(), id).await?)
}

pub(crate) async fn fetch_all<E: Entity>(state: &AppState) -> Result<Vec<E>, ApiError>
where
    dyn TradingStore: EntityStore<E>,
{
    Ok(EntityStore::<E>::list(state.store.as_ref()).await?)
}
