//! Plugin manifest (`<name>.json`) model.

use hearth_core::error::AppError;
use hearth_core::result::AppResult;
use serde::{Deserialize, Deserializer, Serialize, de};

/// Metadata parsed from a plugin's manifest file.
///
/// Only `version` is required. Unknown keys (description, author, ...) are
/// kept verbatim in `extra` so the persisted copy matches the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    /// Declared schema version, applied by `install`. Any whole JSON
    /// number is accepted, so `1.0` reads as `1`.
    #[serde(deserialize_with = "whole_number")]
    pub version: i32,
    /// Plugins that must be enabled first.
    #[serde(default)]
    pub plugin_dependencies: Vec<String>,
    /// External packages installed before the plugin is enabled.
    #[serde(default)]
    pub package_dependencies: Vec<String>,
    /// Remaining manifest fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PluginInfo {
    /// Creates manifest metadata with the given version and no dependencies.
    pub fn new(version: i32) -> Self {
        Self {
            version,
            plugin_dependencies: Vec::new(),
            package_dependencies: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the plugin dependencies.
    pub fn with_plugin_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugin_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the external package dependencies.
    pub fn with_package_dependencies<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.package_dependencies = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Parses and validates a manifest from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let info: Self = serde_json::from_slice(bytes)
            .map_err(|e| AppError::manifest(format!("Malformed manifest: {e}")))?;

        if info.version < 0 {
            return Err(AppError::manifest(format!(
                "Manifest version must be non-negative, got {}",
                info.version
            )));
        }

        Ok(info)
    }
}

fn whole_number<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    let whole = number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .filter(|f| *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
            .map(|f| f as i64)
    });

    whole
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| de::Error::custom(format!("expected a whole version number, got {number}")))
}
