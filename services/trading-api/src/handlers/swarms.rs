//! Swarm handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    create_and_notify, delete_and_notify, fetch_all, fetch_one, update_and_notify, ValidJson,
};
use crate::{
    error::ApiError,
    models::{DeleteResponse, Swarm, SwarmInput},
    AppState,
};

/// POST /swarms
pub async fn create_swarm(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<SwarmInput>,
) -> Result<Json<Swarm>, ApiError> {
    Ok(Json(create_and_notify(&state, req.into_swarm()).await?))
}

/// GET /swarms
pub async fn list_swarms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Swarm>>, ApiError> {
    Ok(Json(fetch_all(&state).await?))
}

/// GET /swarms/{id}
pub async fn get_swarm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Swarm>, ApiError> {
    Ok(Json(fetch_one(&state, id).await?))
}

/// PUT /swarms/{id}
pub async fn update_swarm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<SwarmInput>,
) -> Result<Json<Swarm>, ApiError> {
    Ok(Json(update_and_notify::<Swarm>(&state, id, req.into_changes()).await?))
}

/// DELETE /swarms/{id}
pub async fn delete_swarm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    Ok(Json(delete_and_notify::<Swarm>(&state, id).await?))
}
