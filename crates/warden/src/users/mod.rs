//! User accounts: records, storage, login and registration rules.

mod bootstrap;
mod model;
mod store;

pub use bootstrap::ensure_admin;
pub use model::{User, UserProfile, validate_password, validate_username};
pub use store::{CredentialStore, MemoryCredentialStore};

use warden_common::WardenError;
use warden_common::constants::roles;

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Check a username/password pair and record the login.
///
/// Unknown users and wrong passwords produce the same error. Legacy and
/// bcrypt hashes are rewritten in the salted format on success.
pub async fn authenticate(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<User, WardenError> {
    let Some(mut user) = store.find_by_username(username).await? else {
        tracing::info!(username = %username, "Login for unknown user");
        return Err(WardenError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    };

    if !user.check_password(password).await? {
        tracing::info!(user_id = %user.id, "Login with wrong password");
        return Err(WardenError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    }

    if !user.status.is_active() {
        tracing::info!(user_id = %user.id, status = %user.status, "Login for inactive account");
        return Err(WardenError::Forbidden(format!("account is {}", user.status)));
    }

    if user.password.needs_upgrade() {
        tracing::info!(
            user_id = %user.id,
            scheme = user.password.scheme(),
            "Upgrading stored password hash"
        );
        user.set_password(password);
    }

    user.record_login();
    store.update(&user).await?;

    tracing::info!(user_id = %user.id, role_id = %user.role_id, "Login succeeded");
    Ok(user)
}

/// Create a self-registered account with the viewer role
pub async fn register(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<User, WardenError> {
    validate_username(username)?;
    validate_password(password)?;

    let user = User::new(username, password, roles::VIEWER);
    store.create(user.clone()).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
    Ok(user)
}

/// Replace a password after checking the current one
pub async fn change_password(
    store: &dyn CredentialStore,
    user_id: &str,
    old_password: &str,
    new_password: &str,
) -> Result<(), WardenError> {
    let mut user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| WardenError::NotFound("user".to_string()))?;

    if !user.check_password(old_password).await? {
        return Err(WardenError::Unauthenticated(
            "current password is incorrect".to_string(),
        ));
    }
    validate_password(new_password)?;

    user.set_password(new_password);
    store.update(&user).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordHash;
    use sha2::{Digest, Sha256};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use warden_common::UserStatus;

    async fn store_with(user: User) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.create(user).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = store_with(User::new("alice", "password1", "3")).await;

        let user = authenticate(&store, "alice", "password1").await.unwrap();
        assert!(user.last_login.is_some());

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.last_login, user.last_login);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let store = store_with(User::new("alice", "password1", "3")).await;

        let unknown = authenticate(&store, "bob", "password1").await.unwrap_err();
        let wrong = authenticate(&store, "alice", "password2").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, WardenError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_inactive_account_forbidden() {
        let mut user = User::new("alice", "password1", "3");
        user.status = UserStatus::Blocked;
        let store = store_with(user).await;

        let err = authenticate(&store, "alice", "password1").await.unwrap_err();
        assert!(matches!(err, WardenError::Forbidden(ref m) if m == "account is blocked"));
    }

    #[tokio::test]
    async fn test_legacy_hash_upgraded_on_login() {
        let mut user = User::new("legacy", "ignored", "2");
        let digest = hex::encode(Sha256::digest(b"old-password"));
        user.password = PasswordHash::from_stored(&digest, &[]);
        let store = store_with(user).await;

        authenticate(&store, "legacy", "old-password").await.unwrap();

        let stored = store.find_by_username("legacy").await.unwrap().unwrap();
        assert!(!stored.password.needs_upgrade());
        assert!(stored.check_password("old-password").await.unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_bcrypt_check_leaves_runtime_free() {
        let mut user = User::new("seeded", "ignored", "1");
        let hashed = bcrypt::hash("admin123", 10).unwrap();
        user.password = PasswordHash::from_stored(&hashed, &[]);
        let store = store_with(user).await;

        let ticked = Arc::new(AtomicBool::new(false));
        let ticker = tokio::spawn({
            let ticked = ticked.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                ticked.store(true, Ordering::SeqCst);
            }
        });

        let result = authenticate(&store, "seeded", "wrong-password").await;
        assert!(matches!(result, Err(WardenError::Unauthenticated(_))));
        assert!(ticked.load(Ordering::SeqCst), "timer starved during bcrypt check");
        ticker.await.unwrap();
    }

    #[tokio::test]
    async fn test_register() {
        let store = MemoryCredentialStore::new();

        let user = register(&store, "newbie", "password1").await.unwrap();
        assert_eq!(user.role_id, roles::VIEWER);

        let dup = register(&store, "newbie", "password1").await;
        assert!(matches!(dup, Err(WardenError::Conflict(_))));

        let short = register(&store, "other", "123").await;
        assert!(matches!(short, Err(WardenError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_change_password() {
        let user = User::new("alice", "password1", "3");
        let id = user.id.clone();
        let store = store_with(user).await;

        let wrong = change_password(&store, &id, "nope-nope", "password2").await;
        assert!(matches!(wrong, Err(WardenError::Unauthenticated(_))));

        change_password(&store, &id, "password1", "password2").await.unwrap();
        assert!(authenticate(&store, "alice", "password2").await.is_ok());
        assert!(authenticate(&store, "alice", "password1").await.is_err());
    }
}
