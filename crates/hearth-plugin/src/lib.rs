//! # hearth-plugin
//!
//! Plugin runtime for Hearth. Provides:
//!
//! - Filesystem discovery of plugin units (`<name>.plugin` + `<name>.json`)
//! - Reconciliation of discovered units against the descriptor store
//! - Dependency-aware install/uninstall/enable/disable
//! - Hook dispatch across the enabled set with result merging
//! - Swappable callback loaders (static table, optional `libloading`)

pub mod activation;
pub mod hooks;
pub mod layout;
pub mod loader;
pub mod packages;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod scanner;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use activation::{ActivationManager, PluginSelection};
pub use hooks::{HookDispatcher, HookOrder, ResultMerger};
pub use layout::ModuleLayout;
pub use loader::{
    CallbackLoader, ChainLoader, ClosureCallback, DynamicLoader, HookCallback, StaticLoader,
};
pub use packages::{CommandInstaller, NoopInstaller, PackageInstaller};
pub use registry::{PluginRegistry, RegistryState};
pub use runtime::{PluginRuntime, PluginRuntimeBuilder};
pub use scanner::Scanner;
pub use store::{DescriptorStore, MemoryDescriptorStore};
