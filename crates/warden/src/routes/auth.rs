//! Login, registration, and self-service account endpoints.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use warden_common::{Identity, WardenError};

use super::{ApiError, ApiResponse};
use crate::state::AppState;
use crate::users::{self, UserProfile};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
    pub captcha: String,
    pub captcha_id: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_secs: u64,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn check_captcha(state: &AppState, payload: &CredentialsRequest) -> Result<(), ApiError> {
    if state.captcha.verify(&payload.captcha_id, &payload.captcha).await {
        Ok(())
    } else {
        Err(WardenError::InvalidInput("invalid or expired captcha".to_string()).into())
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(payload) = payload?;
    check_captcha(&state, &payload).await?;

    let user =
        users::authenticate(state.users.as_ref(), &payload.username, &payload.password).await?;
    let token = state.tokens.issue(&user.identity())?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_in_secs: state.tokens.default_ttl().as_secs(),
        user: user.profile(),
    })))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let Json(payload) = payload?;
    check_captcha(&state, &payload).await?;

    let user = users::register(state.users.as_ref(), &payload.username, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse { user: user.profile() })),
    ))
}

/// GET /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user = state
        .users
        .find_by_id(&identity.user_id)
        .await?
        .ok_or_else(|| WardenError::NotFound("user no longer exists".to_string()))?;

    Ok(Json(ApiResponse::success(user.profile())))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let Json(payload) = payload?;

    users::change_password(
        state.users.as_ref(),
        &identity.user_id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "password updated".to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    use crate::users::User;

    async fn login_body(
        state: &crate::state::AppState,
        username: &str,
        password: &str,
    ) -> serde_json::Value {
        state.captcha.insert_known("cid", vec![4, 2, 0, 1, 9, 7]).await;
        json!({
            "username": username,
            "password": password,
            "captcha": "420197",
            "captcha_id": "cid",
        })
    }

    #[tokio::test]
    async fn test_login_success() {
        let state = test_state();
        add_user(&state, User::new("alice", "password1", "3")).await;

        let body = login_body(&state, "alice", "password1").await;
        let (status, resp) = post(&state, "/auth/login", None, body).await;

        assert_eq!(status, StatusCode::OK);
        let token = resp["data"]["token"].as_str().unwrap();
        assert_eq!(resp["data"]["user"]["username"], "alice");
        assert!(resp["data"]["user"].get("password").is_none());

        let claims = state.tokens.validate(token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role_id, "3");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_captcha_before_credentials() {
        let state = test_state();
        add_user(&state, User::new("alice", "password1", "3")).await;
        state.captcha.insert_known("cid", vec![4, 2, 0, 1, 9, 7]).await;

        let body = json!({
            "username": "alice",
            "password": "password1",
            "captcha": "000000",
            "captcha_id": "cid",
        });
        let (status, resp) = post(&state, "/auth/login", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "invalid or expired captcha");

        // Challenge was consumed by the failed attempt
        let retry = json!({
            "username": "alice",
            "password": "password1",
            "captcha": "420197",
            "captcha_id": "cid",
        });
        let (status, _) = post(&state, "/auth/login", None, retry).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let state = test_state();
        add_user(&state, User::new("alice", "password1", "3")).await;

        let body = login_body(&state, "alice", "wrong-pass").await;
        let (status, resp) = post(&state, "/auth/login", None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "invalid username or password");
    }

    #[tokio::test]
    async fn test_login_blocked_account() {
        let state = test_state();
        let mut user = User::new("alice", "password1", "3");
        user.status = warden_common::UserStatus::Inactive;
        add_user(&state, user).await;

        let body = login_body(&state, "alice", "password1").await;
        let (status, resp) = post(&state, "/auth/login", None, body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["error"], "account is inactive");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let state = test_state();
        let (status, resp) = post(&state, "/auth/login", None, json!({ "username": "x" })).await;
        assert!(status.is_client_error());
        assert_eq!(resp["success"], false);
    }

    #[tokio::test]
    async fn test_register() {
        let state = test_state();

        let body = login_body(&state, "newbie", "password1").await;
        let (status, resp) = post(&state, "/auth/register", None, body).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["data"]["user"]["role_id"], "3");
        assert!(resp["data"].get("token").is_none());

        let body = login_body(&state, "newbie", "password1").await;
        let (status, _) = post(&state, "/auth/register", None, body).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_profile_requires_token() {
        let state = test_state();

        let (status, resp) = get(&state, "/auth/profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "missing authorization header");

        let (status, resp) = get(&state, "/auth/profile", Some("Token abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "malformed authorization header");

        let (status, resp) = get(&state, "/auth/profile", Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "invalid token");
    }

    #[tokio::test]
    async fn test_profile() {
        let state = test_state();
        let user = User::new("alice", "password1", "3");
        let auth = bearer_for(&state, &user);
        add_user(&state, user).await;

        let (status, resp) = get(&state, "/auth/profile", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let state = test_state();
        let user = User::new("alice", "password1", "3");
        let token = state
            .tokens
            .issue_with_ttl(&user.identity(), Duration::from_secs(1))
            .unwrap();
        add_user(&state, user).await;

        tokio::time::sleep(Duration::from_secs(2)).await;

        let auth = format!("Bearer {token}");
        let (status, resp) = get(&state, "/auth/profile", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "token expired");
    }

    #[tokio::test]
    async fn test_change_password() {
        let state = test_state();
        let user = User::new("alice", "password1", "3");
        let auth = bearer_for(&state, &user);
        add_user(&state, user).await;

        let body = json!({ "old_password": "wrong-one", "new_password": "password2" });
        let (status, _) = put(&state, "/auth/password", Some(auth.as_str()), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body = json!({ "old_password": "password1", "new_password": "password2" });
        let (status, resp) = put(&state, "/auth/password", Some(auth.as_str()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["message"], "password updated");

        let stored = state.users.find_by_username("alice").await.unwrap().unwrap();
        assert!(stored.check_password("password2").await.unwrap());
    }
}
