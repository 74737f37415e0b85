//! Credential storage seam.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use warden_common::WardenError;

use super::User;

/// Persistence for user accounts.
///
/// The relational store implements this in production.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, WardenError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, WardenError>;

    /// Insert a new account; `Conflict` if the username is taken
    async fn create(&self, user: User) -> Result<(), WardenError>;

    /// Replace an existing account; `NotFound` if it does not exist
    async fn update(&self, user: &User) -> Result<(), WardenError>;

    /// All accounts ordered by username
    async fn list(&self) -> Result<Vec<User>, WardenError>;
}

/// In-memory credential store keyed by username
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, WardenError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, WardenError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: User) -> Result<(), WardenError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(WardenError::Conflict(format!(
                "username {} is already taken",
                user.username
            )));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), WardenError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.username) {
            Some(existing) if existing.id == user.id => {
                *existing = user.clone();
                Ok(())
            }
            _ => Err(WardenError::NotFound(format!("user {}", user.username))),
        }
    }

    async fn list(&self) -> Result<Vec<User>, WardenError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}
