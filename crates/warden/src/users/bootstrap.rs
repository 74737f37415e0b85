//! Startup creation of the initial administrator.

use warden_common::WardenError;
use warden_common::constants::roles;

use super::{CredentialStore, User};
use crate::config::BootstrapConfig;

/// Create the admin account if it does not exist yet.
///
/// Returns true when an account was created.
pub async fn ensure_admin(
    store: &dyn CredentialStore,
    config: &BootstrapConfig,
) -> Result<bool, WardenError> {
    if !config.enabled {
        tracing::debug!("Admin bootstrap disabled");
        return Ok(false);
    }

    if store.find_by_username(&config.admin_username).await?.is_some() {
        tracing::info!(
            username = %config.admin_username,
            "Admin account exists, skipping bootstrap"
        );
        return Ok(false);
    }

    let admin = User::new(&config.admin_username, &config.admin_password, roles::ADMIN);
    store.create(admin).await?;

    tracing::info!(username = %config.admin_username, "Created initial admin account");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::MemoryCredentialStore;

    #[tokio::test]
    async fn test_creates_once() {
        let store = MemoryCredentialStore::new();
        let config = BootstrapConfig::default();

        assert!(ensure_admin(&store, &config).await.unwrap());
        assert!(!ensure_admin(&store, &config).await.unwrap());

        let admin = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role_id, roles::ADMIN);
        assert!(admin.check_password("admin123").await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_account_untouched() {
        let store = MemoryCredentialStore::new();
        store.create(User::new("admin", "changed-pass", roles::ADMIN)).await.unwrap();

        assert!(!ensure_admin(&store, &BootstrapConfig::default()).await.unwrap());
        let admin = store.find_by_username("admin").await.unwrap().unwrap();
        assert!(admin.check_password("changed-pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled() {
        let store = MemoryCredentialStore::new();
        let config = BootstrapConfig {
            enabled: false,
            ..BootstrapConfig::default()
        };

        assert!(!ensure_admin(&store, &config).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }
}
