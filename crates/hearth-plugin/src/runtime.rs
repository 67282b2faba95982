//! Plugin runtime: the host-facing entry point.
//!
//! Owns the registry and wires the scanner, descriptor store, dispatcher
//! and activation manager together.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{info, warn};

use hearth_core::config::PluginConfig;
use hearth_core::error::{AppError, ErrorKind};
use hearth_core::result::AppResult;
use hearth_entity::plugin::PluginDescriptor;

use crate::activation::{ActivationManager, PluginSelection};
use crate::hooks::{HookDispatcher, HookOrder};
use crate::layout::ModuleLayout;
use crate::loader::{CallbackLoader, StaticLoader};
use crate::packages::{CommandInstaller, PackageInstaller};
use crate::registry::{PluginRegistry, reconcile};
use crate::scanner::Scanner;
use crate::store::DescriptorStore;

/// Plugin whose stored descriptor marks the site as installed.
const SITE_PLUGIN: &str = "system";

/// The plugin runtime.
#[derive(Debug)]
pub struct PluginRuntime {
    config: PluginConfig,
    registry: Arc<PluginRegistry>,
    store: Arc<dyn DescriptorStore>,
    scanner: Scanner,
    dispatcher: Arc<HookDispatcher>,
    activation: ActivationManager,
    site_installed: AtomicBool,
}

impl PluginRuntime {
    /// Starts building a runtime from plugin configuration.
    pub fn builder(config: PluginConfig) -> PluginRuntimeBuilder {
        PluginRuntimeBuilder {
            config,
            store: None,
            loader: None,
            installer: None,
        }
    }

    /// Discovers plugins under `roots`, reconciles them with the store and
    /// enables the configured default plugins with their dependencies.
    ///
    /// Scan problems are logged and skipped. Store failures fail the call.
    /// A default plugin that cannot be enabled is logged and does not.
    pub async fn initialize(&self, roots: &[PathBuf]) -> AppResult<()> {
        let scanned = self.scanner.scan(roots).await;

        let mut state = self.registry.write().await;
        let persisted = self.store.list().await.map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to load stored plugins", e)
        })?;
        let site_installed = persisted.iter().any(|d| d.name == SITE_PLUGIN);
        self.site_installed.store(site_installed, Ordering::SeqCst);
        let descriptors = reconcile(scanned, persisted);
        state.load(descriptors.clone());
        self.store.replace_all(&descriptors).await.map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to store reconciled plugins", e)
        })?;

        info!(
            plugins = state.len(),
            enabled = state.enabled().len(),
            "Plugin registry reconciled"
        );

        for name in &self.config.default_plugins {
            if let Err(e) = self
                .activation
                .enable_in(&mut state, name, true, &mut Vec::new())
                .await
            {
                warn!(plugin = %name, error = %e, "Default plugin not enabled");
                break;
            }
        }

        Ok(())
    }

    /// [`initialize`](Self::initialize) over the configured roots.
    pub async fn initialize_from_config(&self) -> AppResult<()> {
        let roots: Vec<PathBuf> = self.config.roots.iter().map(PathBuf::from).collect();
        self.initialize(&roots).await
    }

    /// Calls `hook` of one plugin. `None` when the hook is not implemented.
    pub async fn invoke(&self, name: &str, hook: &str, args: &[Value]) -> AppResult<Option<Value>> {
        self.dispatcher.invoke(name, hook, args).await
    }

    /// Calls `hook` on every enabled implementer and merges the results.
    pub async fn invoke_all(&self, hook: &str, args: &[Value]) -> AppResult<Value> {
        self.dispatcher.invoke_all(hook, args).await
    }

    /// Enabled plugins implementing `hook`, in dispatch order.
    pub async fn implements(&self, hook: &str) -> Vec<String> {
        self.dispatcher.implements(hook).await
    }

    /// See [`ActivationManager::enable`].
    pub async fn enable(
        &self,
        names: impl Into<PluginSelection>,
        with_dependencies: bool,
    ) -> AppResult<()> {
        self.activation.enable(names, with_dependencies).await
    }

    /// See [`ActivationManager::disable`].
    pub async fn disable(
        &self,
        names: impl Into<PluginSelection>,
        with_dependencies: bool,
    ) -> AppResult<()> {
        self.activation.disable(names, with_dependencies).await
    }

    /// See [`ActivationManager::install`].
    pub async fn install(&self, name: &str) -> AppResult<()> {
        self.activation.install(name).await
    }

    /// See [`ActivationManager::uninstall`].
    pub async fn uninstall(&self, name: &str) -> AppResult<()> {
        self.activation.uninstall(name).await
    }

    /// See [`ActivationManager::set_weight`].
    pub async fn set_weight(&self, name: &str, weight: i32) -> AppResult<()> {
        self.activation.set_weight(name, weight).await
    }

    /// Descriptor of `name`.
    pub async fn details(&self, name: &str) -> Option<PluginDescriptor> {
        self.registry.read().await.get(name).cloned()
    }

    /// All known descriptors, sorted by name.
    pub async fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.registry.read().await.descriptors()
    }

    /// Enabled plugin names in activation order.
    pub async fn enabled(&self) -> Vec<String> {
        self.registry.read().await.enabled().to_vec()
    }

    /// Schema version declared by the manifest of `name`.
    pub async fn schema_version(&self, name: &str) -> AppResult<i32> {
        Ok(self.registry.read().await.require(name)?.info.version)
    }

    /// Whether the site was already installed when the last
    /// [`initialize`](Self::initialize) started, i.e. the store held the
    /// `system` plugin before reconciliation rewrote it. `false` until the
    /// runtime has been initialized.
    pub fn is_site_installed(&self) -> bool {
        self.site_installed.load(Ordering::SeqCst)
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The hook dispatcher.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// The plugin configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }
}

/// Builder for [`PluginRuntime`].
#[derive(Debug)]
pub struct PluginRuntimeBuilder {
    config: PluginConfig,
    store: Option<Arc<dyn DescriptorStore>>,
    loader: Option<Arc<dyn CallbackLoader>>,
    installer: Option<Arc<dyn PackageInstaller>>,
}

impl PluginRuntimeBuilder {
    /// Sets the descriptor store (required).
    pub fn store(mut self, store: Arc<dyn DescriptorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the callback loader. Defaults to an empty [`StaticLoader`].
    pub fn loader(mut self, loader: Arc<dyn CallbackLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the package installer. Defaults to the configured command.
    pub fn installer(mut self, installer: Arc<dyn PackageInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Assembles the runtime. The registry starts empty until
    /// [`PluginRuntime::initialize`] runs.
    pub fn build(self) -> AppResult<PluginRuntime> {
        let store = self
            .store
            .ok_or_else(|| AppError::configuration("Plugin runtime requires a descriptor store"))?;
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(StaticLoader::new()));
        let installer = self
            .installer
            .unwrap_or_else(|| CommandInstaller::from_config(&self.config.package_installer));

        let layout = ModuleLayout::from_config(&self.config);
        let order = if self.config.weight_ordering {
            HookOrder::Weight
        } else {
            HookOrder::Activation
        };

        let registry = Arc::new(PluginRegistry::new());
        let dispatcher = Arc::new(
            HookDispatcher::new(registry.clone(), loader, layout.clone()).with_order(order),
        );
        let activation = ActivationManager::new(
            registry.clone(),
            store.clone(),
            dispatcher.clone(),
            installer,
        );

        Ok(PluginRuntime {
            config: self.config,
            registry,
            store,
            scanner: Scanner::new(layout),
            dispatcher,
            activation,
            site_installed: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use hearth_entity::plugin::{PluginStatus, UNINSTALLED};
    use serde_json::json;

    use super::*;
    use crate::store::MemoryDescriptorStore;
    use crate::testing::{Fixture, manifest};

    #[tokio::test]
    async fn test_initialize_enables_defaults_with_dependencies() {
        let fx = Fixture::new();
        fx.unit("system", &manifest(1, &[]));
        fx.unit("menu", &manifest(1, &["system"]));
        fx.unit("blog", &manifest(1, &[]));

        let runtime = fx.build(PluginConfig {
            default_plugins: vec!["menu".into()],
            ..fx.config()
        });
        runtime.initialize_from_config().await.unwrap();

        assert_eq!(runtime.enabled().await, vec!["system", "menu"]);
        assert_eq!(runtime.descriptors().await.len(), 3);
    }

    #[tokio::test]
    async fn test_site_installed_reflects_store_before_reconcile() {
        let fx = Fixture::new();
        fx.unit("system", &manifest(1, &[]));

        let runtime = fx.build(fx.config());
        assert!(!runtime.is_site_installed());

        runtime.initialize_from_config().await.unwrap();
        assert!(!runtime.is_site_installed());
        assert_eq!(
            runtime.details("system").await.unwrap().schema_version,
            UNINSTALLED
        );

        let restarted = fx.runtime().await;
        assert!(restarted.is_site_installed());
    }

    #[tokio::test]
    async fn test_whole_float_manifest_version_is_discovered() {
        let fx = Fixture::new();
        fx.unit("fl", r#"{"version": 1.0}"#);
        let runtime = fx.runtime().await;

        assert_eq!(runtime.schema_version("fl").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_default_does_not_fail_initialize() {
        let fx = Fixture::new();
        fx.unit("blog", &manifest(1, &[]));

        let runtime = fx.build(PluginConfig {
            default_plugins: vec!["system".into(), "menu".into()],
            ..fx.config()
        });
        runtime.initialize_from_config().await.unwrap();

        assert!(runtime.enabled().await.is_empty());
        assert!(!runtime.is_site_installed());
    }

    #[tokio::test]
    async fn test_restart_restores_activation_state() {
        let fx = Fixture::new();
        fx.unit("blog", &manifest(2, &[]));
        fx.unit("shop", &manifest(1, &[]));
        let installs = fx.count_calls("blog", "install");
        fx.write_install("blog");

        let first = fx.runtime().await;
        first.enable("blog", false).await.unwrap();
        first.set_weight("blog", 9).await.unwrap();
        drop(first);

        let second = fx.runtime().await;
        let blog = second.details("blog").await.unwrap();
        assert_eq!(blog.status, PluginStatus::Enabled);
        assert_eq!(blog.schema_version, 2);
        assert_eq!(blog.weight, 9);
        assert_eq!(second.enabled().await, vec!["blog"]);
        assert_eq!(installs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_removed_plugins_are_not_resurrected() {
        let fx = Fixture::new();
        fx.unit("blog", &manifest(1, &[]));
        let first = fx.runtime().await;
        first.enable("blog", false).await.unwrap();

        std::fs::remove_dir_all(fx.root().join("blog")).unwrap();
        let second = fx.runtime().await;

        assert!(second.details("blog").await.is_none());
        assert!(second.enabled().await.is_empty());
        assert!(fx.store.inner().get("blog").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_fails_initialize() {
        let fx = Fixture::new();
        fx.unit("blog", &manifest(1, &[]));
        fx.store.fail_writes(true);

        let runtime = fx.build(fx.config());
        let err = runtime.initialize_from_config().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Persistence);
    }

    #[tokio::test]
    async fn test_schema_version_reads_manifest() {
        let fx = Fixture::new();
        fx.unit("blog", &manifest(7, &[]));
        let runtime = fx.runtime().await;

        assert_eq!(runtime.schema_version("blog").await.unwrap(), 7);
        assert_eq!(
            runtime.details("blog").await.unwrap().schema_version,
            UNINSTALLED
        );
        assert_eq!(
            runtime.schema_version("ghost").await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_weight_ordering_from_config() {
        let fx = Fixture::new();
        for name in ["a", "b"] {
            fx.unit(name, &manifest(1, &[]));
            fx.loader.register_fn(name, "x", move |_| Ok(json!({ "by": name })));
        }

        let runtime = fx.build(PluginConfig {
            weight_ordering: true,
            ..fx.config()
        });
        runtime.initialize_from_config().await.unwrap();
        runtime.enable(["a", "b"], false).await.unwrap();
        runtime.set_weight("a", 10).await.unwrap();

        assert_eq!(runtime.implements("x").await, vec!["b", "a"]);
        assert_eq!(runtime.invoke_all("x", &[]).await.unwrap(), json!({ "by": "a" }));
    }

    #[test]
    fn test_builder_requires_store() {
        let err = PluginRuntime::builder(PluginConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);

        PluginRuntime::builder(PluginConfig::default())
            .store(Arc::new(MemoryDescriptorStore::new()))
            .build()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_activation_and_dispatch_stay_consistent() {
        let fx = Fixture::new();
        for name in ["a", "b", "c"] {
            fx.unit(name, &manifest(1, &[]));
            fx.loader.register_fn(name, "x", move |_| Ok(json!([name])));
        }
        let runtime = Arc::new(fx.runtime().await);

        let mut tasks = Vec::new();
        for i in 0..200usize {
            let runtime = runtime.clone();
            tasks.push(tokio::spawn(async move {
                let name = ["a", "b", "c"][i % 3];
                match i % 4 {
                    0 => runtime.enable(name, false).await.unwrap(),
                    1 => runtime.disable(name, false).await.unwrap(),
                    2 => match runtime.invoke_all("x", &[]).await.unwrap() {
                        Value::Array(items) => {
                            let unique: HashSet<_> = items.iter().map(Value::to_string).collect();
                            assert_eq!(unique.len(), items.len());
                        }
                        Value::Object(map) => assert!(map.is_empty()),
                        other => panic!("unexpected merge result {other}"),
                    },
                    _ => {
                        let state = runtime.registry().read().await;
                        let implementers = runtime
                            .dispatcher()
                            .implementers_in(&state, "x", HookOrder::Activation)
                            .await;
                        assert_eq!(implementers, state.enabled());
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let enabled = runtime.enabled().await;
        let unique: HashSet<_> = enabled.iter().collect();
        assert_eq!(unique.len(), enabled.len());
        assert_eq!(runtime.implements("x").await, enabled);
    }
}
