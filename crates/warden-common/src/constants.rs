//! Shared constants for Warden components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default session token validity (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// Default `iss` claim on issued tokens
pub const DEFAULT_TOKEN_ISSUER: &str = "LVerity";

/// CAPTCHA challenge expiry (5 minutes)
pub const CAPTCHA_TTL_SECS: u64 = 300;

/// Maximum number of outstanding CAPTCHA challenges
pub const CAPTCHA_CAPACITY: usize = 100;

/// Number of digits in a CAPTCHA answer
pub const CAPTCHA_LENGTH: usize = 6;

/// CAPTCHA image width in pixels
pub const CAPTCHA_WIDTH: u32 = 240;

/// CAPTCHA image height in pixels
pub const CAPTCHA_HEIGHT: u32 = 80;

/// Interval between background sweeps of expired CAPTCHAs
pub const CAPTCHA_SWEEP_INTERVAL_SECS: u64 = 60;

/// Salt length for salted password digests
pub const PASSWORD_SALT_LEN: usize = 16;

/// Largest request/response body the access log will buffer
pub const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

/// Default CORS preflight cache lifetime (1 day)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86_400;

/// Account created by the startup bootstrap
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Initial password of the bootstrap account
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Role identifiers of the default role set
pub mod roles {
    /// Full system administrator
    pub const ADMIN: &str = "1";

    /// Day-to-day license/device operations
    pub const OPERATOR: &str = "2";

    /// Read-only access, assigned to self-registered accounts
    pub const VIEWER: &str = "3";
}

/// HTTP header names
pub mod headers {
    /// Scheme prefix expected in the `Authorization` header
    pub const BEARER_PREFIX: &str = "Bearer ";

    /// Client supplied request correlation id
    pub const X_REQUEST_ID: &str = "X-Request-ID";

    /// Proxy chain, first hop is the original client
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

    /// Client address set by a single reverse proxy
    pub const X_REAL_IP: &str = "X-Real-IP";
}
