//! User administration, gated on `user:manage`.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;

use warden_common::{Identity, UserStatus, WardenError};

use super::{ApiError, ApiResponse};
use crate::state::AppState;
use crate::users::UserProfile;

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(ApiResponse::success(
        users.iter().map(|u| u.profile()).collect(),
    )))
}

/// PUT /users/{username}/status
pub async fn set_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(username): Path<String>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let Json(payload) = payload?;
    let status: UserStatus = payload.status.parse().map_err(WardenError::InvalidInput)?;

    let mut user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| WardenError::NotFound(format!("user {username}")))?;

    user.set_status(status);
    state.users.update(&user).await?;

    tracing::info!(
        actor = %identity.user_id,
        user_id = %user.id,
        status = %user.status,
        "User status changed"
    );

    Ok(Json(ApiResponse::success(user.profile())))
}
