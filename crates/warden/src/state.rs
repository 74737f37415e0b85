//! Application state and shared services.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{GrantStore, MemoryGrantStore, PermissionChecker, TokenService};
use crate::captcha::CaptchaService;
use crate::config::AppConfig;
use crate::users::{CredentialStore, MemoryCredentialStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Session token issuer/validator
    pub tokens: Arc<TokenService>,

    /// Role grant checks
    pub permissions: PermissionChecker,

    /// Login CAPTCHA
    pub captcha: Arc<CaptchaService>,

    /// User accounts
    pub users: Arc<dyn CredentialStore>,
}

impl AppState {
    /// Build state backed by the in-memory stores
    pub fn new(config: AppConfig) -> Result<Self> {
        let grants: Arc<dyn GrantStore> = Arc::new(MemoryGrantStore::with_default_grants());
        let users: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        Self::with_stores(config, users, grants)
    }

    fn with_stores(
        config: AppConfig,
        users: Arc<dyn CredentialStore>,
        grants: Arc<dyn GrantStore>,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let tokens = TokenService::new(
            &config.jwt.secret,
            Duration::from_secs(config.jwt.ttl_secs),
            &config.jwt.issuer,
        )
        .context("Failed to initialise token service")?;

        let captcha = CaptchaService::new(&config.captcha);

        Ok(Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            permissions: PermissionChecker::new(grants),
            captcha: Arc::new(captcha),
            users,
        })
    }
}
