//! Callback loading: turns a `(plugin, hook)` pair into something callable.
//!
//! The dispatcher only knows [`CallbackLoader`]; whether callbacks come from
//! a compiled-in registration table or from shared libraries on disk is a
//! choice of the host.

pub mod dynamic;
pub mod static_table;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use hearth_core::result::AppResult;
use hearth_entity::plugin::PluginDescriptor;

pub use dynamic::DynamicLoader;
pub use static_table::StaticLoader;

/// A loaded hook callback.
///
/// Arguments and results are opaque JSON values; `Value::Null` stands for
/// "no result". An `Err` is reported to the caller of the dispatch.
#[async_trait]
pub trait HookCallback: Send + Sync + std::fmt::Debug {
    /// Runs the callback.
    async fn call(&self, args: &[Value]) -> AppResult<Value>;
}

/// Resolves hook callbacks for plugins.
pub trait CallbackLoader: Send + Sync + std::fmt::Debug {
    /// Returns the callback for `hook` of `descriptor`, whose module file is
    /// `module`. The dispatcher calls this only for existing module files.
    /// `None` when the module lacks the hook.
    fn resolve(
        &self,
        descriptor: &PluginDescriptor,
        hook: &str,
        module: &Path,
    ) -> Option<Arc<dyn HookCallback>>;
}

/// Tries several loaders in order; the first to resolve a hook wins.
#[derive(Debug, Default)]
pub struct ChainLoader {
    loaders: Vec<Arc<dyn CallbackLoader>>,
}

impl ChainLoader {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loader with lower priority than the ones already added.
    pub fn with(mut self, loader: Arc<dyn CallbackLoader>) -> Self {
        self.loaders.push(loader);
        self
    }
}

impl CallbackLoader for ChainLoader {
    fn resolve(
        &self,
        descriptor: &PluginDescriptor,
        hook: &str,
        module: &Path,
    ) -> Option<Arc<dyn HookCallback>> {
        self.loaders
            .iter()
            .find_map(|loader| loader.resolve(descriptor, hook, module))
    }
}

type BoxedHandler =
    Arc<dyn Fn(Vec<Value>) -> Pin<Box<dyn Future<Output = AppResult<Value>> + Send>> + Send + Sync>;

/// A closure-based hook callback.
pub struct ClosureCallback {
    handler: BoxedHandler,
}

impl std::fmt::Debug for ClosureCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureCallback")
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureCallback {
    /// Wraps an async closure.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Value>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Wraps a synchronous closure.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> AppResult<Value> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(move |args| {
            let handler = handler.clone();
            async move { handler(args) }
        })
    }

    /// A callback that always returns `value`.
    pub fn returning(value: Value) -> Self {
        Self::sync(move |_| Ok(value.clone()))
    }
}

#[async_trait]
impl HookCallback for ClosureCallback {
    async fn call(&self, args: &[Value]) -> AppResult<Value> {
        (self.handler)(args.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_closure_callback_receives_args() {
        let callback = ClosureCallback::sync(|args| Ok(json!(args.len())));
        let result = callback.call(&[json!(1), json!("two")]).await.unwrap();
        assert_eq!(result, json!(2));
    }

    #[tokio::test]
    async fn test_chain_prefers_earlier_loader() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("menu");
        let module = dir.join("menu.plugin");
        crate::testing::write_file(&module, "");
        let d = PluginDescriptor::discovered(
            "menu",
            "menu",
            dir.to_string_lossy(),
            hearth_entity::plugin::PluginInfo::new(1),
        );

        let first = Arc::new(StaticLoader::new());
        first.register_fn("menu", "menu", |_| Ok(json!("first")));
        let second = Arc::new(StaticLoader::new());
        second.register_fn("menu", "menu", |_| Ok(json!("second")));
        second.register_fn("menu", "boot", |_| Ok(json!("second")));

        let chain = ChainLoader::new()
            .with(first)
            .with(Arc::new(DynamicLoader::new()))
            .with(second);

        let menu = chain.resolve(&d, "menu", &module).unwrap();
        assert_eq!(menu.call(&[]).await.unwrap(), json!("first"));
        let boot = chain.resolve(&d, "boot", &module).unwrap();
        assert_eq!(boot.call(&[]).await.unwrap(), json!("second"));
        assert!(chain.resolve(&d, "router", &module).is_none());
    }

    #[tokio::test]
    async fn test_async_closure_callback() {
        let callback = ClosureCallback::new(|args| async move {
            tokio::task::yield_now().await;
            Ok(json!({ "first": args.first().cloned() }))
        });
        let result = callback.call(&[json!("x")]).await.unwrap();
        assert_eq!(result, json!({ "first": "x" }));
    }
}
