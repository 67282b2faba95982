//! Site and plugin status.

use serde::Serialize;

use crate::output::{self, OutputFormat};
use hearth_core::config::AppConfig;
use hearth_core::error::AppError;

#[derive(Debug, Serialize)]
struct StatusReport {
    site_installed: bool,
    plugins: usize,
    enabled: Vec<String>,
    roots: Vec<String>,
}

/// Execute the status command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let runtime = super::runtime(config).await?;

    let report = StatusReport {
        site_installed: runtime.is_site_installed(),
        plugins: runtime.descriptors().await.len(),
        enabled: runtime.enabled().await,
        roots: config.plugins.roots.clone(),
    };

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            println!("Hearth status:");
            output::print_kv("Site installed", &report.site_installed.to_string());
            output::print_kv("Plugin roots", &report.roots.join(", "));
            output::print_kv("Plugins discovered", &report.plugins.to_string());
            output::print_kv("Enabled", &report.enabled.join(", "));
            if !report.site_installed {
                output::print_warning("The system plugin was not stored before this run");
            }
        }
    }

    Ok(())
}
