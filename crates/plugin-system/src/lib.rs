//! Built-in plugins shipped with Hearth.
//!
//! The `system` and `menu` units live under `plugins/` like any other
//! plugin; their hooks are compiled in and registered on a
//! [`StaticLoader`] keyed by the unit's file stem.

pub mod menu;
pub mod system;

use std::sync::Arc;

use hearth_plugin::{ChainLoader, DynamicLoader, StaticLoader};

/// Registers the hooks of every built-in plugin.
pub fn register(loader: &StaticLoader) {
    system::register(loader);
    menu::register(loader);
}

/// Loader used by Hearth binaries: built-in hooks first, then shared
/// libraries when the `dynamic` feature is enabled.
pub fn host_loader() -> ChainLoader {
    let builtin = Arc::new(StaticLoader::new());
    register(&builtin);
    ChainLoader::new()
        .with(builtin)
        .with(Arc::new(DynamicLoader::new()))
}
