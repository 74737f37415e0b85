//! HTTP route handlers for Warden.

use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;
use crate::middleware::{RequiredPermission, access_log, require_auth, require_permission};
use crate::state::AppState;

mod auth;
mod captcha;
mod error;
mod health;
mod users;

pub use error::ApiError;

/// Envelope for every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/profile", get(auth::profile))
        .route("/auth/password", put(auth::change_password))
        .merge(admin_routes(&state))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Login flow
        .route("/auth/captcha", get(captcha::get_captcha))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))

        .merge(protected)
        .layer(cors_layer(&state.config.cors))
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

/// User administration, requires `user:manage`
fn admin_routes(state: &AppState) -> Router<AppState> {
    let required = RequiredPermission::new(state.permissions.clone(), "user", "manage");

    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{username}/status", put(users::set_status))
        .route_layer(middleware::from_fn_with_state(required, require_permission))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = if config.allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    layer
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age_secs))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get(&test_state(), "/auth/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restricted_cors_origins_build() {
        let state = test_state_with(|config| {
            config.cors.allowed_origins = vec![
                "https://admin.example.com".to_string(),
                "bad\norigin".to_string(),
            ];
        });
        let (status, _) = get(&state, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
