//! Configuration management for Warden.
//!
//! Sources, lowest precedence first: TOML file, `WARDEN__*` environment
//! variables, then CLI flags (which have their own env fallbacks).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

use warden_common::WardenError;
use warden_common::constants::{
    CAPTCHA_CAPACITY, CAPTCHA_HEIGHT, CAPTCHA_LENGTH, CAPTCHA_SWEEP_INTERVAL_SECS, CAPTCHA_TTL_SECS,
    CAPTCHA_WIDTH, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, DEFAULT_CORS_MAX_AGE_SECS,
    DEFAULT_LISTEN_ADDR, DEFAULT_TOKEN_ISSUER, DEFAULT_TOKEN_TTL_SECS,
};

/// Smallest pixel box one CAPTCHA digit can be drawn in
const MIN_DIGIT_WIDTH: u32 = 5;
const MIN_IMAGE_HEIGHT: u32 = 7;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Session token configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// CAPTCHA configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Startup admin account
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Session token settings
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC signing secret, required
    #[serde(default)]
    pub secret: String,

    /// Token validity in seconds
    #[serde(default = "default_token_ttl")]
    pub ttl_secs: u64,

    /// `iss` claim written and required on validation
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &if self.secret.is_empty() { "" } else { "<redacted>" })
            .field("ttl_secs", &self.ttl_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: default_token_ttl(),
            issuer: default_issuer(),
        }
    }
}

/// CAPTCHA-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Challenge validity in seconds
    #[serde(default = "default_captcha_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of outstanding challenges
    #[serde(default = "default_captcha_capacity")]
    pub capacity: usize,

    /// Number of digits in the answer
    #[serde(default = "default_captcha_length")]
    pub length: usize,

    /// Image width in pixels
    #[serde(default = "default_captcha_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_captcha_height")]
    pub height: u32,

    /// Seconds between background sweeps of expired challenges
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_captcha_ttl(),
            capacity: default_captcha_capacity(),
            length: default_captcha_length(),
            width: default_captcha_width(),
            height: default_captcha_height(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Cross-origin settings for the admin front end
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Preflight cache lifetime in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_secs: default_cors_max_age(),
        }
    }
}

/// Admin account created on first start
#[derive(Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("enabled", &self.enabled)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_token_ttl() -> u64 { DEFAULT_TOKEN_TTL_SECS }
fn default_issuer() -> String { DEFAULT_TOKEN_ISSUER.to_string() }
fn default_captcha_ttl() -> u64 { CAPTCHA_TTL_SECS }
fn default_captcha_capacity() -> usize { CAPTCHA_CAPACITY }
fn default_captcha_length() -> usize { CAPTCHA_LENGTH }
fn default_captcha_width() -> u32 { CAPTCHA_WIDTH }
fn default_captcha_height() -> u32 { CAPTCHA_HEIGHT }
fn default_sweep_interval() -> u64 { CAPTCHA_SWEEP_INTERVAL_SECS }
fn default_cors_max_age() -> u64 { DEFAULT_CORS_MAX_AGE_SECS }
fn default_true() -> bool { true }
fn default_admin_username() -> String { DEFAULT_ADMIN_USERNAME.to_string() }
fn default_admin_password() -> String { DEFAULT_ADMIN_PASSWORD.to_string() }

impl AppConfig {
    /// Load configuration from file and environment, with CLI overrides
    pub fn load(config_path: &str, args: &crate::cli::Args) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()
            .context("Failed to load configuration")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.apply_overrides(args);
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &crate::cli::Args) {
        if let Some(ref listen) = args.listen {
            self.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.jwt_secret {
            self.jwt.secret = secret.clone();
        }
        if let Some(ref expire) = args.jwt_expire {
            self.jwt.ttl_secs = expire.as_secs();
        }
        if let Some(ref issuer) = args.jwt_issuer {
            self.jwt.issuer = issuer.clone();
        }
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), WardenError> {
        self.listen_addr.parse::<SocketAddr>().map_err(|e| {
            WardenError::Config(format!("invalid listen_addr {:?}: {e}", self.listen_addr))
        })?;

        if self.jwt.secret.is_empty() {
            return Err(WardenError::Config(
                "jwt.secret must be set (JWT_SECRET or WARDEN__JWT__SECRET)".to_string(),
            ));
        }
        if self.jwt.ttl_secs == 0 {
            return Err(WardenError::Config("jwt.ttl_secs must be positive".to_string()));
        }

        let captcha = &self.captcha;
        if captcha.ttl_secs == 0 || captcha.sweep_interval_secs == 0 {
            return Err(WardenError::Config(
                "captcha.ttl_secs and captcha.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if captcha.capacity == 0 || captcha.length == 0 {
            return Err(WardenError::Config(
                "captcha.capacity and captcha.length must be positive".to_string(),
            ));
        }
        let min_width = u32::try_from(captcha.length)
            .ok()
            .and_then(|len| len.checked_mul(MIN_DIGIT_WIDTH));
        if min_width.is_none_or(|min| captcha.width < min) || captcha.height < MIN_IMAGE_HEIGHT {
            return Err(WardenError::Config(format!(
                "captcha image {}x{} is too small for {} digits",
                captcha.width, captcha.height, captcha.length
            )));
        }

        if self.bootstrap.enabled
            && (self.bootstrap.admin_username.is_empty()
                || self.bootstrap.admin_password.is_empty())
        {
            return Err(WardenError::Config(
                "bootstrap admin username and password must be non-empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            jwt: JwtConfig::default(),
            captcha: CaptchaConfig::default(),
            cors: CorsConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}
