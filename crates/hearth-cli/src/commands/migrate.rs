//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use hearth_core::config::AppConfig;
use hearth_core::error::AppError;
use hearth_database::DatabasePool;
use hearth_database::repositories::PluginRepository;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Forget all stored plugin state
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            let db = DatabasePool::connect(&config.database).await?;
            hearth_database::migration::run_migrations(db.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Reset { force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(
                        "This forgets every plugin's status and schema version. Continue?",
                    )
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let db = super::connect(config).await?;
            let repo = PluginRepository::new(db.pool().clone());
            let forgotten = repo.count().await?;
            repo.replace_all(&[]).await?;
            output::print_success(&format!("Forgot {forgotten} stored plugins."));
        }
    }

    Ok(())
}
