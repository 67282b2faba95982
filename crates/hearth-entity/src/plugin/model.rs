//! Plugin descriptor entity.

use serde::{Deserialize, Serialize};

use super::manifest::PluginInfo;
use super::status::PluginStatus;

/// Schema version of a plugin that has never been installed.
pub const UNINSTALLED: i32 = -1;

/// Descriptor of a discovered plugin (maps to the `plugins` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PluginDescriptor {
    /// Unique registry name.
    pub name: String,
    /// File stem shared by the unit's module and manifest files.
    ///
    /// Equal to `name` except for units namespaced by their directory
    /// after a name collision.
    pub basename: String,
    /// Directory containing the unit (scan root joined with its subpath).
    pub filepath: String,
    /// Activation status.
    pub status: PluginStatus,
    /// Last installed schema version, or [`UNINSTALLED`].
    pub schema_version: i32,
    /// Hook dispatch ordering key (lower runs first).
    pub weight: i32,
    /// Parsed manifest.
    #[sqlx(json)]
    pub info: PluginInfo,
}

impl PluginDescriptor {
    /// Creates a freshly discovered descriptor in the default state:
    /// disabled, never installed, weight 0.
    pub fn discovered(
        name: impl Into<String>,
        basename: impl Into<String>,
        filepath: impl Into<String>,
        info: PluginInfo,
    ) -> Self {
        Self {
            name: name.into(),
            basename: basename.into(),
            filepath: filepath.into(),
            status: PluginStatus::Disabled,
            schema_version: UNINSTALLED,
            weight: 0,
            info,
        }
    }

    /// Whether `install` has completed for this plugin.
    pub fn is_installed(&self) -> bool {
        self.schema_version != UNINSTALLED
    }

    /// Whether the plugin is enabled.
    pub fn is_enabled(&self) -> bool {
        self.status == PluginStatus::Enabled
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, patch: &DescriptorPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(schema_version) = patch.schema_version {
            self.schema_version = schema_version;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
    }
}

/// Partial update of the activation state of a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorPatch {
    /// New status.
    pub status: Option<PluginStatus>,
    /// New schema version.
    pub schema_version: Option<i32>,
    /// New weight.
    pub weight: Option<i32>,
}

impl DescriptorPatch {
    /// Patch updating only the status.
    pub fn status(status: PluginStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch updating only the schema version.
    pub fn schema_version(schema_version: i32) -> Self {
        Self {
            schema_version: Some(schema_version),
            ..Self::default()
        }
    }

    /// Patch updating only the weight.
    pub fn weight(weight: i32) -> Self {
        Self {
            weight: Some(weight),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_defaults() {
        let d = PluginDescriptor::discovered("menu", "menu", "plugins/menu", PluginInfo::new(1));
        assert_eq!(d.status, PluginStatus::Disabled);
        assert_eq!(d.schema_version, UNINSTALLED);
        assert_eq!(d.weight, 0);
        assert!(!d.is_installed());
        assert!(!d.is_enabled());
    }

    #[test]
    fn test_apply_patch_touches_only_set_fields() {
        let mut d =
            PluginDescriptor::discovered("menu", "menu", "plugins/menu", PluginInfo::new(1));
        d.apply(&DescriptorPatch::schema_version(1));
        assert_eq!(d.schema_version, 1);
        assert_eq!(d.status, PluginStatus::Disabled);

        d.apply(&DescriptorPatch::status(PluginStatus::Enabled));
        assert!(d.is_enabled());
        assert_eq!(d.schema_version, 1);
        assert_eq!(d.weight, 0);
    }
}
