//! Plugin listing.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use hearth_core::config::AppConfig;
use hearth_core::error::AppError;
use hearth_entity::plugin::PluginDescriptor;

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show enabled plugins, in activation order
    #[arg(long)]
    pub enabled: bool,
}

/// One row of the plugin table
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    /// Registry name
    #[tabled(rename = "Name")]
    pub name: String,
    /// Activation status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Installed schema version, `-` when not installed
    #[tabled(rename = "Schema")]
    pub schema: String,
    /// Manifest version
    #[tabled(rename = "Version")]
    pub version: i32,
    /// Dispatch weight
    #[tabled(rename = "Weight")]
    pub weight: i32,
    /// Declared plugin dependencies
    #[tabled(rename = "Depends on")]
    pub dependencies: String,
    /// Unit directory
    #[tabled(rename = "Path")]
    pub path: String,
}

impl From<&PluginDescriptor> for PluginRow {
    fn from(d: &PluginDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            status: d.status.to_string(),
            schema: if d.is_installed() {
                d.schema_version.to_string()
            } else {
                "-".to_string()
            },
            version: d.info.version,
            weight: d.weight,
            dependencies: d.info.plugin_dependencies.join(", "),
            path: d.filepath.clone(),
        }
    }
}

/// Execute the list command
pub async fn execute(args: &ListArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let runtime = super::runtime(config).await?;

    let rows: Vec<PluginRow> = if args.enabled {
        let mut rows = Vec::new();
        for name in runtime.enabled().await {
            if let Some(d) = runtime.details(&name).await {
                rows.push(PluginRow::from(&d));
            }
        }
        rows
    } else {
        runtime.descriptors().await.iter().map(PluginRow::from).collect()
    };

    output::print_list(&rows, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use hearth_entity::plugin::{PluginInfo, PluginStatus};

    use super::*;

    #[test]
    fn test_row_from_descriptor() {
        let mut d = PluginDescriptor::discovered(
            "menu",
            "menu",
            "plugins/menu",
            PluginInfo::new(3).with_plugin_dependencies(["system"]),
        );
        let row = PluginRow::from(&d);
        assert_eq!(row.schema, "-");
        assert_eq!(row.status, "disabled");
        assert_eq!(row.dependencies, "system");

        d.schema_version = 3;
        d.status = PluginStatus::Enabled;
        let row = PluginRow::from(&d);
        assert_eq!(row.schema, "3");
        assert_eq!(row.status, "enabled");
    }
}
