//! Plugin activation status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Activation status of a plugin, stored as an integer column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    /// Not taking part in hook dispatch.
    #[default]
    Disabled = 0,
    /// Active; listed in the enabled set.
    Enabled = 1,
}

impl PluginStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
