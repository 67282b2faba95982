//! Plugin runtime configuration.

use serde::{Deserialize, Serialize};

/// Plugin runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directories scanned for plugins. Later roots win on name collision.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// Plugins enabled (with their dependencies) at every boot.
    #[serde(default = "default_plugins")]
    pub default_plugins: Vec<String>,
    /// Extension of the manifest file (`<name>.json`).
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
    /// Extension of the main implementation module (`<name>.plugin`).
    #[serde(default = "default_implementation_extension")]
    pub implementation_extension: String,
    /// Extension of the module holding the `install` and `schema` hooks.
    #[serde(default = "default_install_extension")]
    pub install_extension: String,
    /// Order hook implementers by weight instead of activation order.
    #[serde(default)]
    pub weight_ordering: bool,
    /// External package installer used for `packageDependencies`.
    #[serde(default)]
    pub package_installer: PackageInstallerConfig,
}

/// Command used to install external package dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInstallerConfig {
    /// Whether package dependencies are installed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Program to run.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the package name.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Per-package timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            default_plugins: default_plugins(),
            manifest_extension: default_manifest_extension(),
            implementation_extension: default_implementation_extension(),
            install_extension: default_install_extension(),
            weight_ordering: false,
            package_installer: PackageInstallerConfig::default(),
        }
    }
}

impl Default for PackageInstallerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            program: default_program(),
            args: default_args(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_roots() -> Vec<String> {
    vec!["plugins".to_string(), "site/plugins".to_string()]
}

fn default_plugins() -> Vec<String> {
    vec!["system".to_string(), "menu".to_string()]
}

fn default_manifest_extension() -> String {
    "json".to_string()
}

fn default_implementation_extension() -> String {
    "plugin".to_string()
}

fn default_install_extension() -> String {
    "install".to_string()
}

fn default_true() -> bool {
    true
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_args() -> Vec<String> {
    vec!["install".to_string()]
}

fn default_timeout() -> u64 {
    300
}
