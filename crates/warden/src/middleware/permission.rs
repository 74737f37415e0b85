//! Per-route-group permission gate. Runs after `require_auth`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use warden_common::{Identity, Permission, WardenError};

use crate::auth::PermissionChecker;
use crate::routes::ApiError;

/// Grant a route group requires, plus the checker to ask
#[derive(Clone)]
pub struct RequiredPermission {
    checker: PermissionChecker,
    permission: Permission,
}

impl RequiredPermission {
    pub fn new(checker: PermissionChecker, resource: &str, action: &str) -> Self {
        Self {
            checker,
            permission: Permission::new(resource, action),
        }
    }
}

pub async fn require_permission(
    State(required): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| WardenError::Unauthenticated("authentication required".to_string()))?;

    let allowed = required
        .checker
        .check_permission(&identity.role_id, &required.permission)
        .await?;

    if !allowed {
        tracing::info!(
            user_id = %identity.user_id,
            role_id = %identity.role_id,
            permission = %required.permission,
            "Permission denied"
        );
        return Err(WardenError::Forbidden("insufficient permissions".to_string()).into());
    }

    Ok(next.run(request).await)
}
