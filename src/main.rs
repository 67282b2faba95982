//! Hearth server: boots the plugin runtime and keeps it alive until shutdown.
//!
//! Wires configuration, logging, the descriptor store and the built-in
//! plugins together, then fires the `boot` and `shutdown` hooks.

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

use hearth_core::config::AppConfig;
use hearth_core::error::AppError;
use hearth_database::DatabasePool;
use hearth_database::repositories::PluginRepository;
use hearth_plugin::PluginRuntime;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("HEARTH_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("HEARTH_ENV").ok();

    AppConfig::load(&config_path, env.as_deref())
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Hearth");

    // ── Descriptor store ─────────────────────────────────────────
    let db = DatabasePool::connect_and_migrate(&config.database).await?;
    let store = Arc::new(PluginRepository::new(db.pool().clone()));

    // ── Plugin runtime ───────────────────────────────────────────
    let runtime = PluginRuntime::builder(config.plugins.clone())
        .store(store)
        .loader(Arc::new(plugin_system::host_loader()))
        .build()?;
    runtime.initialize_from_config().await?;

    if !runtime.is_site_installed() {
        tracing::warn!("Site was not installed before this boot: the system plugin was not stored");
    }

    let enabled = runtime.enabled().await;
    tracing::info!(enabled = ?enabled, "Plugins ready");

    let routes = runtime.invoke_all("router", &[]).await?;
    tracing::info!(
        routes = routes.as_array().map(Vec::len).unwrap_or_default(),
        "Routes collected from plugins"
    );

    let boot = json!({ "version": env!("CARGO_PKG_VERSION") });
    runtime.invoke_all("boot", &[boot]).await?;
    tracing::info!("Hearth started, press Ctrl+C to stop");

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Err(e) = runtime.invoke_all("shutdown", &[]).await {
        tracing::warn!(error = %e, "Shutdown hook failed");
    }
    db.close().await;

    tracing::info!("Hearth shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
