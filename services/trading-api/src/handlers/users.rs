//! User handlers
//!
//! Responses and events carry [`UserView`]; the password hash stays in the
//! store.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    create_and_notify, delete_and_notify, fetch_all, fetch_one, update_and_notify, ValidJson,
};
use crate::{
    error::ApiError,
    models::{DeleteResponse, User, UserChanges, UserInput, UserUpdate, UserView},
    passwords::{hash_password, verify_password},
    AppState,
};

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<UserInput>,
) -> Result<Json<UserView>, ApiError> {
    let hash = hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user = create_and_notify(&state, User::new(req.username, req.email, hash)).await?;

    Ok(Json(UserView::from(&user)))
}

/// GET /users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserView>>, ApiError> {
    let users: Vec<User> = fetch_all(&state).await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let user: User = fetch_one(&state, id).await?;
    Ok(Json(UserView::from(&user)))
}

/// PUT /users/{id} - rehashes only when the password actually changes
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UserUpdate>,
) -> Result<Json<UserView>, ApiError> {
    let password_hash = match req.password.as_deref() {
        Some(password) => {
            let current: User = fetch_one(&state, id).await?;
            if verify_password(password, &current.password_hash) {
                None
            } else {
                Some(hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))?)
            }
        }
        None => None,
    };

    let changes = UserChanges {
        username: req.username,
        email: req.email,
        password_hash,
        updated_at: Utc::now(),
    };
    let user = update_and_notify::<User>(&state, id, changes).await?;

    Ok(Json(UserView::from(&user)))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    Ok(Json(delete_and_notify::<User>(&state, id).await?))
}
