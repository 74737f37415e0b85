//! Credential hashing, session tokens, and permission checks.

mod password;
mod permission;
mod token;

pub use password::PasswordHash;
pub use permission::{GrantStore, MemoryGrantStore, PermissionChecker};
pub use token::{Claims, TokenError, TokenService};
