//! Common error types for Warden components.

use thiserror::Error;

/// Common errors across Warden components
#[derive(Debug, Error)]
pub enum WardenError {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing, malformed, invalid, or expired credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated caller lacks the required grant
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// CAPTCHA store is at capacity even after expired entries were swept
    #[error("CAPTCHA store is full")]
    StorageFull,

    /// CAPTCHA rendering or encoding failed
    #[error("CAPTCHA error: {0}")]
    Captcha(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credential or grant store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::StorageFull => 503,
            Self::Captcha(_) => 500,
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Store(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if the message is safe to show to the client as-is
    pub fn is_client_facing(&self) -> bool {
        self.status_code() < 500 || matches!(self, Self::StorageFull)
    }
}
