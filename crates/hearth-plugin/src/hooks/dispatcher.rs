//! Hook dispatcher: finds the enabled plugins implementing a hook, calls
//! them in order and merges their results.
//!
//! Public entry points take the registry read lock. The `*_in` variants
//! work on a state the caller already holds, which is how activation
//! runs a plugin's own `install`/`uninstall` hook under the write lock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use hearth_core::error::{AppError, ErrorKind};
use hearth_core::result::AppResult;

use super::merge::ResultMerger;
use crate::layout::ModuleLayout;
use crate::loader::{CallbackLoader, HookCallback};
use crate::registry::{PluginRegistry, RegistryState};

/// Order in which implementers of a hook are invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOrder {
    /// Order in which plugins joined the enabled set.
    #[default]
    Activation,
    /// Ascending `weight`, ties kept in activation order.
    Weight,
}

/// Dispatches named hooks across the enabled plugin set.
#[derive(Debug)]
pub struct HookDispatcher {
    registry: Arc<PluginRegistry>,
    loader: Arc<dyn CallbackLoader>,
    layout: ModuleLayout,
    order: HookOrder,
}

impl HookDispatcher {
    /// Creates a dispatcher using activation order.
    pub fn new(
        registry: Arc<PluginRegistry>,
        loader: Arc<dyn CallbackLoader>,
        layout: ModuleLayout,
    ) -> Self {
        Self {
            registry,
            loader,
            layout,
            order: HookOrder::default(),
        }
    }

    /// Sets the default invocation order.
    pub fn with_order(mut self, order: HookOrder) -> Self {
        self.order = order;
        self
    }

    /// The default invocation order.
    pub fn order(&self) -> HookOrder {
        self.order
    }

    /// Enabled plugins implementing `hook`, in the default order.
    pub async fn implements(&self, hook: &str) -> Vec<String> {
        self.implements_ordered(hook, self.order).await
    }

    /// Enabled plugins implementing `hook`, in the given order.
    pub async fn implements_ordered(&self, hook: &str, order: HookOrder) -> Vec<String> {
        let state = self.registry.read().await;
        self.implementers_in(&state, hook, order).await
    }

    /// Calls `hook` of plugin `name`.
    ///
    /// Returns `Ok(None)` when the plugin does not implement the hook and
    /// `NotFound` when the plugin is unknown.
    pub async fn invoke(&self, name: &str, hook: &str, args: &[Value]) -> AppResult<Option<Value>> {
        let state = self.registry.read().await;
        self.invoke_in(&state, name, hook, args).await
    }

    /// Calls `hook` on every implementer and merges the results.
    ///
    /// The first failing callback aborts the dispatch.
    pub async fn invoke_all(&self, hook: &str, args: &[Value]) -> AppResult<Value> {
        let state = self.registry.read().await;
        let implementers = self.implementers_in(&state, hook, self.order).await;
        debug!(hook, implementers = implementers.len(), "Dispatching hook");

        let mut merger = ResultMerger::new();
        for name in &implementers {
            if let Some(result) = self.invoke_in(&state, name, hook, args).await? {
                merger.push(result);
            }
        }
        Ok(merger.finish())
    }

    /// Implementers of `hook` within `state`, filling the hook cache.
    ///
    /// The cache always holds activation order; weight order is applied on
    /// top of it.
    pub(crate) async fn implementers_in(
        &self,
        state: &RegistryState,
        hook: &str,
        order: HookOrder,
    ) -> Vec<String> {
        let mut names = match state.cached_implementers(hook) {
            Some(names) => names,
            None => {
                let mut names = Vec::new();
                for name in state.enabled() {
                    if self.resolve_in(state, name, hook).await.is_some() {
                        names.push(name.clone());
                    }
                }
                debug!(hook, implementers = names.len(), "Caching hook implementers");
                state.cache_implementers(hook, names.clone());
                names
            }
        };

        if order == HookOrder::Weight {
            names.sort_by_key(|name| state.get(name).map(|d| d.weight).unwrap_or_default());
        }
        names
    }

    /// Resolves the callback for `hook` of `name`. Loaders are only asked
    /// once the module file is known to exist.
    pub(crate) async fn resolve_in(
        &self,
        state: &RegistryState,
        name: &str,
        hook: &str,
    ) -> Option<Arc<dyn HookCallback>> {
        let descriptor = state.get(name)?;
        let module = self.layout.module_path(descriptor, hook);
        let is_file = tokio::fs::metadata(&module)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return None;
        }
        self.loader.resolve(descriptor, hook, &module)
    }

    pub(crate) async fn invoke_in(
        &self,
        state: &RegistryState,
        name: &str,
        hook: &str,
        args: &[Value],
    ) -> AppResult<Option<Value>> {
        state.require(name)?;
        let Some(callback) = self.resolve_in(state, name, hook).await else {
            return Ok(None);
        };

        debug!(plugin = name, hook, "Invoking hook");
        let result = callback.call(args).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Plugin,
                format!("Hook '{hook}' of plugin '{name}' failed"),
                e,
            )
        })?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::testing::{Fixture, manifest};

    #[tokio::test]
    async fn test_invoke_all_merges_in_activation_order() {
        let fx = Fixture::new();
        for name in ["a", "b", "c"] {
            fx.unit(name, &manifest(1, &[]));
        }
        fx.loader.register_fn("a", "x", |_| Ok(json!({"a": 1})));
        fx.loader.register_fn("b", "x", |_| Ok(json!({"b": 2})));
        fx.loader.register_fn("c", "x", |_| Ok(json!([3, 4])));

        let runtime = fx.runtime().await;
        runtime.enable(["a", "b", "c"], false).await.unwrap();

        assert_eq!(runtime.implements("x").await, vec!["a", "b", "c"]);
        let merged = runtime.invoke_all("x", &[]).await.unwrap();
        assert_eq!(merged, json!([{"a": 1, "b": 2}, 3, 4]));
    }

    #[tokio::test]
    async fn test_empty_implements_is_cached() {
        let fx = Fixture::new();
        fx.unit("a", &manifest(1, &[]));
        let runtime = fx.runtime().await;
        runtime.enable("a", false).await.unwrap();

        let before = runtime.registry().read().await.cached_hook_count();
        assert!(runtime.implements("install").await.is_empty());
        assert_eq!(runtime.registry().read().await.cached_hook_count(), before + 1);

        fx.loader.register_fn("a", "install", |_| Ok(Value::Null));
        fx.write_install("a");
        assert!(runtime.implements("install").await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_plugins_do_not_implement() {
        let fx = Fixture::new();
        fx.unit("a", &manifest(1, &[]));
        fx.unit("b", &manifest(1, &[]));
        fx.loader.register_fn("a", "x", |_| Ok(json!(1)));
        fx.loader.register_fn("b", "x", |_| Ok(json!(2)));

        let runtime = fx.runtime().await;
        runtime.enable(["a", "b"], false).await.unwrap();
        assert_eq!(runtime.implements("x").await, vec!["a", "b"]);

        runtime.disable("a", false).await.unwrap();
        assert_eq!(runtime.implements("x").await, vec!["b"]);
        assert_eq!(runtime.invoke_all("x", &[]).await.unwrap(), json!([2]));
    }

    #[tokio::test]
    async fn test_weight_order_sorts_stably() {
        let fx = Fixture::new();
        for name in ["a", "b", "c"] {
            fx.unit(name, &manifest(1, &[]));
            fx.loader.register_fn(name, "x", move |_| Ok(json!(name)));
        }

        let runtime = fx.runtime().await;
        runtime.enable(["a", "b", "c"], false).await.unwrap();
        runtime.set_weight("c", -5).await.unwrap();
        runtime.set_weight("a", 3).await.unwrap();

        let dispatcher = runtime.dispatcher();
        assert_eq!(
            dispatcher.implements_ordered("x", HookOrder::Weight).await,
            vec!["c", "b", "a"]
        );
        assert_eq!(
            dispatcher.implements_ordered("x", HookOrder::Activation).await,
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn test_invoke_missing_hook_and_unknown_plugin() {
        let fx = Fixture::new();
        fx.unit("a", &manifest(1, &[]));
        let runtime = fx.runtime().await;

        assert_eq!(runtime.invoke("a", "nothing", &[]).await.unwrap(), None);
        let err = runtime.invoke("ghost", "x", &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invoke_passes_args_and_surfaces_failures() {
        let fx = Fixture::new();
        fx.unit("a", &manifest(1, &[]));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        fx.loader.register_fn("a", "echo", move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Array(args))
        });
        fx.loader
            .register_fn("a", "boom", |_| Err(AppError::internal("exploded")));

        let runtime = fx.runtime().await;
        runtime.enable("a", false).await.unwrap();

        let echoed = runtime.invoke("a", "echo", &[json!(1), json!("x")]).await.unwrap();
        assert_eq!(echoed, Some(json!([1, "x"])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = runtime.invoke_all("boom", &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Plugin);
    }

    #[tokio::test]
    async fn test_registered_hook_without_module_file_is_not_implemented() {
        let fx = Fixture::new();
        fx.unit("a", &manifest(1, &[]));
        fx.loader.register_fn("a", "install", |_| Ok(json!("installed")));

        let runtime = fx.runtime().await;
        runtime.enable("a", false).await.unwrap();

        assert!(runtime.implements("install").await.is_empty());
        assert_eq!(runtime.invoke("a", "install", &[]).await.unwrap(), None);

        fx.write_install("a");
        assert_eq!(
            runtime.invoke("a", "install", &[]).await.unwrap(),
            Some(json!("installed"))
        );
    }
}
