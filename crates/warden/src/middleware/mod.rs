//! Request middleware: bearer auth, permission gates, access logging.

mod auth;
mod logging;
mod permission;

pub use auth::require_auth;
pub use logging::access_log;
pub use permission::{RequiredPermission, require_permission};
