//! # Warden Common
//!
//! Shared types, errors, and constants used across Warden components.
//!
//! ## Modules
//! - `types` - Core data structures (Identity, UserStatus, CaptchaChallenge, etc.)
//! - `error` - Common error taxonomy
//! - `constants` - Shared configuration defaults

pub mod constants;
pub mod error;
pub mod types;

pub use error::WardenError;
pub use types::*;
