//! CLI command definitions and dispatch.

pub mod list;
pub mod migrate;
pub mod plugin;
pub mod status;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use hearth_core::config::AppConfig;
use hearth_core::error::AppError;
use hearth_database::DatabasePool;
use hearth_database::repositories::PluginRepository;
use hearth_plugin::PluginRuntime;

/// Hearth: plugin administration
#[derive(Debug, Parser)]
#[command(name = "hearth", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Configuration overlay (`config/<env>.toml`)
    #[arg(short, long, env = "HEARTH_ENV")]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a plugin (run its install hook)
    Install(plugin::NameArgs),
    /// Uninstall a plugin (run its uninstall hook)
    Uninstall(plugin::NameArgs),
    /// Enable plugins; a trailing `true` also enables their dependencies
    Enable(plugin::ActivationArgs),
    /// Disable plugins; a trailing `true` also disables their dependencies
    Disable(plugin::ActivationArgs),
    /// List discovered plugins
    List(list::ListArgs),
    /// Show site and plugin status
    Status,
    /// Database migration management
    Migrate(migrate::MigrateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config, self.env.as_deref())?;

        match &self.command {
            Commands::Install(args) => plugin::install(args, &config).await,
            Commands::Uninstall(args) => plugin::uninstall(args, &config).await,
            Commands::Enable(args) => plugin::enable(args, &config).await,
            Commands::Disable(args) => plugin::disable(args, &config).await,
            Commands::List(args) => list::execute(args, &config, self.format).await,
            Commands::Status => status::execute(&config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str, env: Option<&str>) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path, env)
}

/// Helper: open the database with migrations applied
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect_and_migrate(&config.database).await
}

/// Helper: build and initialize the plugin runtime over the database
///
/// Every plugin command starts from a freshly reconciled registry, which
/// also enables the default plugins.
pub async fn runtime(config: &AppConfig) -> Result<PluginRuntime, AppError> {
    let db = connect(config).await?;

    let runtime = PluginRuntime::builder(config.plugins.clone())
        .store(Arc::new(PluginRepository::new(db.pool().clone())))
        .loader(Arc::new(plugin_system::host_loader()))
        .build()?;
    runtime.initialize_from_config().await?;
    tracing::debug!(enabled = ?runtime.enabled().await, "Plugin runtime initialized");
    Ok(runtime)
}
