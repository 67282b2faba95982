//! Plugin descriptor, status, and manifest models.

pub mod manifest;
pub mod model;
pub mod status;

pub use manifest::PluginInfo;
pub use model::{DescriptorPatch, PluginDescriptor, UNINSTALLED};
pub use status::PluginStatus;
