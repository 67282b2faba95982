//! Shared test helpers: on-disk plugin layouts and fake collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use hearth_core::config::PluginConfig;
use hearth_core::error::AppError;
use hearth_core::result::AppResult;
use hearth_entity::plugin::{DescriptorPatch, PluginDescriptor};

use crate::loader::StaticLoader;
use crate::packages::PackageInstaller;
use crate::runtime::PluginRuntime;
use crate::store::{DescriptorStore, MemoryDescriptorStore};

/// Manifest JSON with the given version and plugin dependencies.
pub fn manifest(version: i32, dependencies: &[&str]) -> String {
    json!({ "version": version, "pluginDependencies": dependencies }).to_string()
}

/// Manifest JSON declaring external package dependencies.
pub fn manifest_with_packages(version: i32, packages: &[&str]) -> String {
    json!({ "version": version, "packageDependencies": packages }).to_string()
}

/// Writes `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Writes a plugin unit (`<basename>.plugin` + `<basename>.json`) into `dir`.
pub fn write_unit(dir: &Path, basename: &str, manifest_json: &str) {
    write_file(&dir.join(format!("{basename}.plugin")), "");
    write_file(&dir.join(format!("{basename}.json")), manifest_json);
}

/// Store wrapper whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryDescriptorStore,
    fail: AtomicBool,
}

impl FailingStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryDescriptorStore {
        &self.inner
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl DescriptorStore for FailingStore {
    async fn list(&self) -> AppResult<Vec<PluginDescriptor>> {
        self.inner.list().await
    }

    async fn replace_all(&self, descriptors: &[PluginDescriptor]) -> AppResult<()> {
        self.check()?;
        self.inner.replace_all(descriptors).await
    }

    async fn update_by_name(&self, name: &str, patch: &DescriptorPatch) -> AppResult<()> {
        self.check()?;
        self.inner.update_by_name(name, patch).await
    }
}

/// Installer recording every package it is asked for.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    installed: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl RecordingInstaller {
    pub fn failing(packages: &[&str]) -> Self {
        Self {
            installed: Mutex::new(Vec::new()),
            failing: packages.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageInstaller for RecordingInstaller {
    async fn install(&self, package: &str) -> AppResult<()> {
        self.installed.lock().unwrap().push(package.to_string());
        if self.failing.iter().any(|p| p == package) {
            return Err(AppError::external_install(format!("cannot fetch {package}")));
        }
        Ok(())
    }
}

/// A temporary plugin root plus fake collaborators.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub loader: Arc<StaticLoader>,
    pub store: Arc<FailingStore>,
    pub installer: Arc<RecordingInstaller>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            loader: Arc::new(StaticLoader::new()),
            store: Arc::new(FailingStore::default()),
            installer: Arc::new(RecordingInstaller::default()),
        }
    }

    pub fn with_failing_packages(mut self, packages: &[&str]) -> Self {
        self.installer = Arc::new(RecordingInstaller::failing(packages));
        self
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("plugins")
    }

    /// Writes unit `name` directly under the plugin root.
    pub fn unit(&self, name: &str, manifest_json: &str) {
        write_unit(&self.root().join(name), name, manifest_json);
    }

    /// Adds the install module of unit `name`.
    pub fn write_install(&self, name: &str) {
        write_file(&self.root().join(name).join(format!("{name}.install")), "");
    }

    /// Registers a callback for `hook` that counts its calls.
    pub fn count_calls(&self, name: &str, hook: &str) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        self.loader.register_fn(name, hook, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        calls
    }

    pub fn config(&self) -> PluginConfig {
        PluginConfig {
            roots: vec![self.root().to_string_lossy().into_owned()],
            default_plugins: Vec::new(),
            ..PluginConfig::default()
        }
    }

    /// Builds a runtime over the fixture and initializes it.
    pub async fn runtime(&self) -> PluginRuntime {
        let runtime = self.build(self.config());
        runtime.initialize_from_config().await.unwrap();
        runtime
    }

    pub fn build(&self, config: PluginConfig) -> PluginRuntime {
        PluginRuntime::builder(config)
            .store(self.store.clone())
            .loader(self.loader.clone())
            .installer(self.installer.clone())
            .build()
            .unwrap()
    }
}
