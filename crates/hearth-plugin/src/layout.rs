//! File naming rules for plugin units and hook modules.

use std::path::{Path, PathBuf};

use hearth_core::config::PluginConfig;
use hearth_entity::plugin::PluginDescriptor;

/// Hooks whose callbacks live in the install module instead of the main
/// implementation module.
const INSTALL_MODULE_HOOKS: [&str; 2] = ["install", "schema"];

/// Extensions identifying the files of a plugin unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Manifest file extension.
    pub manifest_extension: String,
    /// Main implementation module extension.
    pub implementation_extension: String,
    /// Install module extension.
    pub install_extension: String,
}

impl ModuleLayout {
    /// Builds the layout from plugin configuration.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self {
            manifest_extension: config.manifest_extension.clone(),
            implementation_extension: config.implementation_extension.clone(),
            install_extension: config.install_extension.clone(),
        }
    }

    /// Extension of the module that holds `hook`.
    pub fn extension_for(&self, hook: &str) -> &str {
        if INSTALL_MODULE_HOOKS.contains(&hook) {
            &self.install_extension
        } else {
            &self.implementation_extension
        }
    }

    /// Path of the module file holding `hook` for the given plugin.
    pub fn module_path(&self, descriptor: &PluginDescriptor, hook: &str) -> PathBuf {
        Path::new(&descriptor.filepath).join(format!(
            "{}.{}",
            descriptor.basename,
            self.extension_for(hook)
        ))
    }

    /// File name of a unit's manifest.
    pub fn manifest_file(&self, basename: &str) -> String {
        format!("{basename}.{}", self.manifest_extension)
    }

    /// File name of a unit's main implementation module.
    pub fn implementation_file(&self, basename: &str) -> String {
        format!("{basename}.{}", self.implementation_extension)
    }
}

impl Default for ModuleLayout {
    fn default() -> Self {
        Self::from_config(&PluginConfig::default())
    }
}
