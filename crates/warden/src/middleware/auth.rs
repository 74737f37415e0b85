//! Bearer token authentication.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use warden_common::WardenError;
use warden_common::constants::headers::BEARER_PREFIX;

use crate::routes::ApiError;
use crate::state::AppState;

/// Validate the bearer token and attach the caller's `Identity` to the request
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    let claims = state.tokens.validate(token).map_err(|e| {
        tracing::debug!(error = %e, path = %request.uri().path(), "Rejected session token");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(claims.identity());
    Ok(next.run(request).await)
}

/// Extract `<token>` from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, WardenError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| WardenError::Unauthenticated("missing authorization header".to_string()))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty() && !token.contains(char::is_whitespace))
        .ok_or_else(|| WardenError::Unauthenticated("malformed authorization header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn message(result: Result<&str, WardenError>) -> String {
        match result {
            Err(WardenError::Unauthenticated(msg)) => msg,
            other => panic!("expected Unauthenticated, got {other:?}"),
        }
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(message(bearer_token(&HeaderMap::new())), "missing authorization header");
    }

    #[test]
    fn test_malformed_header() {
        for value in [
            "abc.def.ghi",
            "Basic dXNlcjpwYXNz",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "Bearer   abc.def.ghi",
            "Bearer abc def",
        ] {
            assert_eq!(
                message(bearer_token(&headers(value))),
                "malformed authorization header",
                "header {value:?}"
            );
        }
    }
}
