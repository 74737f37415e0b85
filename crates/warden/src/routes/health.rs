//! Health check endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use super::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    captcha_pending: usize,
    captcha_capacity: usize,
}

/// Readiness check with CAPTCHA store occupancy
pub async fn ready_check(State(state): State<AppState>) -> Json<ApiResponse<ReadyResponse>> {
    let store = state.captcha.store();
    let pending = store.len().await;
    let capacity = store.capacity();

    Json(ApiResponse::success(ReadyResponse {
        status: if pending < capacity { "ready" } else { "saturated" },
        captcha_pending: pending,
        captcha_capacity: capacity,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(&test_state(), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_reports_occupancy() {
        let state = test_state();
        state.captcha.generate().await.unwrap();

        let (status, body) = get(&state, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ready");
        assert_eq!(body["data"]["captcha_pending"], 1);
        assert_eq!(body["data"]["captcha_capacity"], 100);
    }
}
