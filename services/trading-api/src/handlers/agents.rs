//! Agent handlers

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
    models::{Agent, AgentInput, DeleteResponse},
    AppState,
};

/// POST /agents
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<AgentInput>,
) -> Result<Json<Agent>, ApiError> {
    let agent = create_and_notify(&state, req.into_agent()).await?;
    Ok(Json(agent))
}

/// GET /agents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(fetch_all(&state).await?))
}

/// GET /agents/{id}
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(fetch_one(&state, id).await?))
}

/// PUT /agents/{id} - full replace; `created_at` is kept
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<AgentInput>,
) -> Result<Json<Agent>, ApiError> {
    let agent = update_and_notify::<Agent>(&state, id, req.into_changes()).await?;
    Ok(Json(agent))
}

/// DELETE /agents/{id}
pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    Ok(Json(delete_and_notify::<Agent>(&state, id).await?))
}
