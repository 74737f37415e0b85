//! # Warden - LVerity authentication gate
//!
//! Issues and validates session tokens, checks role grants, and guards
//! login and registration with a digit CAPTCHA.
//!
//! ## Request path
//! ```text
//! access log → auth (bearer token) → permission (role grant) → handler
//!                     ↓                      ↓
//!               TokenService         PermissionChecker
//! ```

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

pub mod auth;
pub mod captcha;
pub mod cli;
pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;

pub use cli::Args;
pub use config::AppConfig;
pub use state::AppState;

/// Load configuration, build services, and serve until Ctrl+C
pub async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(&args.config, &args)?;
    info!(path = %args.config, "Configuration loaded");

    let state = AppState::new(config).context("Failed to initialise services")?;

    if users::ensure_admin(state.users.as_ref(), &state.config.bootstrap)
        .await
        .context("Admin bootstrap failed")?
    {
        info!(
            username = %state.config.bootstrap.admin_username,
            "Bootstrap admin created, change its password after first login"
        );
    }

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Spawn CAPTCHA sweeper
    let sweep_interval = Duration::from_secs(state.config.captcha.sweep_interval_secs);
    tokio::spawn(captcha::sweep_worker(
        state.captcha.store(),
        sweep_interval,
        shutdown_tx.subscribe(),
    ));

    let listen_addr = state.config.listen_addr.clone();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!(addr = %listen_addr, "Warden listening");

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Warden shutdown complete");
    Ok(())
}
