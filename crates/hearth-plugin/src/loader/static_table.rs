//! Registration-table loader for compiled-in plugins.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use hearth_core::result::AppResult;
use hearth_entity::plugin::PluginDescriptor;

use super::{CallbackLoader, ClosureCallback, HookCallback};

/// Loader backed by a `(basename, hook) → callback` table.
///
/// The dispatcher only consults the table once the module file exists, so
/// removing a plugin directory disables its callbacks just like it would
/// for dynamically loaded code.
#[derive(Debug, Default)]
pub struct StaticLoader {
    callbacks: DashMap<(String, String), Arc<dyn HookCallback>>,
}

impl StaticLoader {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for `hook` of the plugin with file stem `plugin`.
    pub fn register(&self, plugin: &str, hook: &str, callback: Arc<dyn HookCallback>) {
        debug!(plugin, hook, "Registering static hook callback");
        self.callbacks
            .insert((plugin.to_string(), hook.to_string()), callback);
    }

    /// Registers a synchronous closure.
    pub fn register_fn<F>(&self, plugin: &str, hook: &str, handler: F)
    where
        F: Fn(Vec<Value>) -> AppResult<Value> + Send + Sync + 'static,
    {
        self.register(plugin, hook, Arc::new(ClosureCallback::sync(handler)));
    }

    /// Removes every callback registered for `plugin`.
    pub fn unregister_plugin(&self, plugin: &str) {
        self.callbacks.retain(|(owner, _), _| owner != plugin);
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl CallbackLoader for StaticLoader {
    fn resolve(
        &self,
        descriptor: &PluginDescriptor,
        hook: &str,
        _module: &Path,
    ) -> Option<Arc<dyn HookCallback>> {
        self.callbacks
            .get(&(descriptor.basename.clone(), hook.to_string()))
            .map(|entry| entry.value().clone())
    }
}
