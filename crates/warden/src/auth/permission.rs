//! Role-based permission checks against the role/permission grant relation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use warden_common::constants::roles;
use warden_common::{Permission, WardenError};

/// Read access to the `(role_id, resource, action)` grant relation.
///
/// Implemented by the relational store in production; `MemoryGrantStore`
/// stands in for it here.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn has_grant(&self, role_id: &str, permission: &Permission) -> Result<bool, WardenError>;
}

/// Answers "may this role do that?"
#[derive(Clone)]
pub struct PermissionChecker {
    store: Arc<dyn GrantStore>,
}

impl PermissionChecker {
    pub fn new(store: Arc<dyn GrantStore>) -> Self {
        Self { store }
    }

    /// True iff `role_id` holds exactly this `(resource, action)` grant.
    ///
    /// No wildcards or hierarchy: `device:manage` does not imply `device:view`.
    pub async fn check(
        &self,
        role_id: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, WardenError> {
        self.check_permission(role_id, &Permission::new(resource, action)).await
    }

    pub async fn check_permission(
        &self,
        role_id: &str,
        permission: &Permission,
    ) -> Result<bool, WardenError> {
        let allowed = self.store.has_grant(role_id, permission).await?;

        tracing::debug!(
            role_id = %role_id,
            permission = %permission,
            allowed = allowed,
            "Permission check"
        );

        Ok(allowed)
    }
}

/// In-memory grant relation
#[derive(Default)]
pub struct MemoryGrantStore {
    grants: RwLock<HashSet<(String, Permission)>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the default admin/operator/viewer matrix
    pub fn with_default_grants() -> Self {
        let all = [
            ("system", "admin"),
            ("license", "manage"),
            ("device", "manage"),
            ("user", "manage"),
            ("alert", "manage"),
            ("log", "view"),
        ];
        let operator = [("license", "manage"), ("device", "manage"), ("alert", "manage")];
        let viewer = [("log", "view")];

        let mut grants = HashSet::new();
        for (role_id, set) in [
            (roles::ADMIN, &all[..]),
            (roles::OPERATOR, &operator[..]),
            (roles::VIEWER, &viewer[..]),
        ] {
            for (resource, action) in set {
                grants.insert((role_id.to_string(), Permission::new(*resource, *action)));
            }
        }

        Self {
            grants: RwLock::new(grants),
        }
    }

    pub async fn grant(&self, role_id: &str, permission: Permission) {
        self.grants.write().await.insert((role_id.to_string(), permission));
    }

    #[cfg(test)]
    pub(crate) async fn revoke(&self, role_id: &str, permission: &Permission) -> bool {
        self.grants
            .write()
            .await
            .remove(&(role_id.to_string(), permission.clone()))
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn has_grant(&self, role_id: &str, permission: &Permission) -> Result<bool, WardenError> {
        let grants = self.grants.read().await;
        Ok(grants.contains(&(role_id.to_string(), permission.clone())))
    }
}
