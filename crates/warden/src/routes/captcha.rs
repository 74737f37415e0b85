//! CAPTCHA issue endpoint.

use axum::{Json, extract::State};

use warden_common::CaptchaChallenge;

use super::{ApiError, ApiResponse};
use crate::state::AppState;

/// GET /auth/captcha
pub async fn get_captcha(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CaptchaChallenge>>, ApiError> {
    let challenge = state.captcha.generate().await?;
    Ok(Json(ApiResponse::success(challenge)))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_issues_challenge() {
        let state = test_state();
        let (status, body) = get(&state, "/auth/captcha", None).await;

        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["captcha_id"].as_str().unwrap();
        assert!(body["data"]["captcha_image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(state.captcha.store().contains(id).await);
    }

    #[tokio::test]
    async fn test_full_store_is_unavailable() {
        let state = test_state_with(|config| config.captcha.capacity = 1);
        get(&state, "/auth/captcha", None).await;

        let (status, body) = get(&state, "/auth/captcha", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }
}
