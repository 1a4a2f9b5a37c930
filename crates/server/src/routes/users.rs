//! `/users/{id}`: structured user records, stored verbatim. No update route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use models::User;
use tracing::info;

use super::{stored_value, ServerState};
use crate::errors::ApiError;

pub async fn read_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let value = state.store.read(&user_id).await?;
    Ok(stored_value(value))
}

pub async fn save_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(body): Json<User>,
) -> Result<(StatusCode, Json<bool>), ApiError> {
    let saved = state.store.write(&user_id, &body).await?;
    info!(%user_id, "user saved");
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn delete_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&user_id).await?;
    info!(%user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
