//! HTTP-facing error wrapper.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use warden_common::WardenError;

use super::ApiResponse;
use crate::auth::TokenError;

/// A `WardenError` on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub WardenError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Message shown to the client. Server-side causes stay in the logs.
    fn client_message(&self) -> String {
        match &self.0 {
            WardenError::Unauthenticated(msg)
            | WardenError::Forbidden(msg)
            | WardenError::InvalidInput(msg)
            | WardenError::NotFound(msg)
            | WardenError::Conflict(msg) => msg.clone(),
            WardenError::StorageFull => "too many pending captchas, try again later".to_string(),
            WardenError::Store(_) => "service temporarily unavailable".to_string(),
            WardenError::Config(_) | WardenError::Captcha(_) | WardenError::Internal(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self.0 {
            WardenError::StorageFull | WardenError::Store(_) => {
                tracing::warn!(error = %self.0, "Service unavailable");
            }
            err if !err.is_client_facing() => {
                tracing::error!(error = %err, "Request failed");
            }
            _ => {}
        }

        let body = ApiResponse::<()>::error(self.client_message());
        (status, Json(body)).into_response()
    }
}

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        Self(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(WardenError::InvalidInput(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: WardenError) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let (status, body) =
            render(WardenError::Forbidden("insufficient permissions".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "insufficient permissions");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_server_errors_are_generic() {
        let (status, body) = render(WardenError::Internal("db password is hunter2".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");

        let (status, _) = render(WardenError::StorageFull).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = render(WardenError::Store("timeout".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "service temporarily unavailable");
    }

    #[tokio::test]
    async fn test_token_errors() {
        let (status, body) = render(TokenError::Expired.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token expired");
    }
}
