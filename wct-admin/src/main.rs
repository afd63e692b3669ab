//! wct-admin - talk review service
//!
//! Serves the rating endpoints, the applicant roster and the per-applicant
//! email action over HTTP.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use wct_admin::{build_router, AppState};
use wct_common::config::{ConfigOverrides, WctConfig};
use wct_common::db::init::{init_database, load_nonce_secret};

/// Command-line arguments for wct-admin
#[derive(Parser, Debug)]
#[command(name = "wct-admin")]
#[command(about = "Talk proposal review service")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5730
    #[arg(short, long)]
    bind: Option<String>,

    /// Config file (default: ~/.config/wct/config.toml, then /etc/wct/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting wct-admin v{} ({})",
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );

    let args = Args::parse();
    let config = WctConfig::resolve(&ConfigOverrides {
        database_path: args.database,
        bind_addr: args.bind,
        config_file: args.config,
    })
    .context("Invalid configuration")?;
    info!("Database path: {}", config.database_path.display());

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };
    let nonce_secret = load_nonce_secret(&pool).await?;

    let state = AppState::new(pool, &config, nonce_secret);
    state.rates_cache.spawn_invalidation(&state.bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("wct-admin listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
