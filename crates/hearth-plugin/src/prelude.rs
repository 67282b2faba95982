//! Convenient re-exports for hosts and compiled-in plugins.

pub use crate::activation::PluginSelection;
pub use crate::hooks::dispatcher::HookOrder;
pub use crate::loader::{CallbackLoader, ChainLoader, ClosureCallback, HookCallback, StaticLoader};
pub use crate::runtime::PluginRuntime;
pub use crate::store::DescriptorStore;

pub use hearth_core::error::{AppError, ErrorKind};
pub use hearth_core::result::AppResult;
pub use hearth_entity::plugin::{PluginDescriptor, PluginInfo, PluginStatus};

pub use async_trait::async_trait;
pub use serde_json::{Value, json};
