//! Strategy handlers

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
    models::{DeleteResponse, Strategy, StrategyInput},
    AppState,
};

/// POST /strategies
pub async fn create_strategy(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<StrategyInput>,
) -> Result<Json<Strategy>, ApiError> {
    Ok(Json(create_and_notify(&state, req.into_strategy()).await?))
}

/// GET /strategies
pub async fn list_strategies(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Strategy>>, ApiError> {
    Ok(Json(fetch_all(&state).await?))
}

/// GET /strategies/{id}
pub async fn get_strategy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Strategy>, ApiError> {
    Ok(Json(fetch_one(&state, id).await?))
}

/// PUT /strategies/{id}
pub async fn update_strategy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<StrategyInput>,
) -> Result<Json<Strategy>, ApiError> {
    Ok(Json(update_and_notify::<Strategy>(&state, id, req.into_changes()).await?))
}

/// DELETE /strategies/{id}
pub async fn delete_strategy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    Ok(Json(delete_and_notify::<Strategy>(&state, id).await?))
}
