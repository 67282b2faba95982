//! Activation manager: install, uninstall, enable and disable.
//!
//! Per plugin the lifecycle is `uninstalled (-1)` → `installed, disabled`
//! → `installed, enabled`. Every public operation holds the registry write
//! lock for its whole duration, hook callbacks and store writes included,
//! so no reader ever sees a half-applied transition.
//!
//! Memory is updated before the store. When a store write fails the
//! operation returns `Persistence` and the in-memory state stays
//! authoritative until the next reconciliation.
//!
//! Hook callbacks run under the write lock and must not call back into
//! activation or dispatch, or they will deadlock.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use hearth_core::error::{AppError, ErrorKind};
use hearth_core::result::AppResult;
use hearth_entity::plugin::{DescriptorPatch, PluginStatus, UNINSTALLED};

use crate::hooks::HookDispatcher;
use crate::packages::{PackageInstaller, install_packages};
use crate::registry::{PluginRegistry, RegistryState};
use crate::store::DescriptorStore;

/// One plugin name or an ordered batch of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSelection {
    /// A single plugin.
    One(String),
    /// Several plugins, processed left to right.
    Many(Vec<String>),
}

impl PluginSelection {
    /// The selected names in processing order.
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

impl From<&str> for PluginSelection {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for PluginSelection {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<&String> for PluginSelection {
    fn from(name: &String) -> Self {
        Self::One(name.clone())
    }
}

impl From<Vec<String>> for PluginSelection {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<&[String]> for PluginSelection {
    fn from(names: &[String]) -> Self {
        Self::Many(names.to_vec())
    }
}

impl From<Vec<&str>> for PluginSelection {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PluginSelection {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PluginSelection {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Drives plugin lifecycle transitions.
#[derive(Debug)]
pub struct ActivationManager {
    registry: Arc<PluginRegistry>,
    store: Arc<dyn DescriptorStore>,
    dispatcher: Arc<HookDispatcher>,
    installer: Arc<dyn PackageInstaller>,
}

impl ActivationManager {
    /// Creates a manager over the shared registry.
    pub fn new(
        registry: Arc<PluginRegistry>,
        store: Arc<dyn DescriptorStore>,
        dispatcher: Arc<HookDispatcher>,
        installer: Arc<dyn PackageInstaller>,
    ) -> Self {
        Self {
            registry,
            store,
            dispatcher,
            installer,
        }
    }

    /// Runs the plugin's own `install` hook and records its manifest
    /// version as the schema version. No-op when already installed.
    pub async fn install(&self, name: &str) -> AppResult<()> {
        let mut state = self.registry.write().await;
        self.install_in(&mut state, name).await
    }

    /// Runs the plugin's `uninstall` hook and resets its schema version.
    /// An enabled plugin is disabled first. No-op when not installed.
    pub async fn uninstall(&self, name: &str) -> AppResult<()> {
        let mut state = self.registry.write().await;
        self.uninstall_in(&mut state, name).await
    }

    /// Enables one plugin or a batch, optionally enabling declared plugin
    /// dependencies first.
    ///
    /// A batch stops at the first failure and returns it. Plugins enabled
    /// earlier in the same batch stay enabled.
    pub async fn enable(
        &self,
        names: impl Into<PluginSelection>,
        with_dependencies: bool,
    ) -> AppResult<()> {
        let mut state = self.registry.write().await;
        for name in names.into().into_names() {
            self.enable_in(&mut state, &name, with_dependencies, &mut Vec::new())
                .await?;
        }
        Ok(())
    }

    /// Disables one plugin or a batch.
    ///
    /// With `with_dependencies`, the plugin's declared *dependencies* are
    /// disabled first. Batches stop at the first failure without rollback.
    pub async fn disable(
        &self,
        names: impl Into<PluginSelection>,
        with_dependencies: bool,
    ) -> AppResult<()> {
        let mut state = self.registry.write().await;
        for name in names.into().into_names() {
            self.disable_in(&mut state, &name, with_dependencies, &mut Vec::new())
                .await?;
        }
        Ok(())
    }

    /// Changes the dispatch weight of a plugin.
    pub async fn set_weight(&self, name: &str, weight: i32) -> AppResult<()> {
        let mut state = self.registry.write().await;
        state.set_weight(name, weight)?;
        self.persist(name, DescriptorPatch::weight(weight)).await?;
        debug!(plugin = name, weight, "Plugin weight updated");
        Ok(())
    }

    pub(crate) async fn install_in(&self, state: &mut RegistryState, name: &str) -> AppResult<()> {
        let descriptor = state.require(name)?;
        if descriptor.is_installed() {
            return Ok(());
        }
        let version = descriptor.info.version;

        self.dispatcher.invoke_in(state, name, "install", &[]).await?;
        state.set_schema_version(name, version)?;
        self.persist(name, DescriptorPatch::schema_version(version))
            .await?;

        info!(plugin = name, schema_version = version, "Plugin installed");
        Ok(())
    }

    pub(crate) async fn uninstall_in(
        &self,
        state: &mut RegistryState,
        name: &str,
    ) -> AppResult<()> {
        if !state.require(name)?.is_installed() {
            return Ok(());
        }
        if state.is_enabled(name) {
            self.deactivate(state, name).await?;
        }

        self.dispatcher
            .invoke_in(state, name, "uninstall", &[])
            .await?;
        state.set_schema_version(name, UNINSTALLED)?;
        self.persist(name, DescriptorPatch::schema_version(UNINSTALLED))
            .await?;

        info!(plugin = name, "Plugin uninstalled");
        Ok(())
    }

    /// Enables `name`, with its dependencies first when requested.
    ///
    /// `trail` holds the plugins currently being enabled further up the
    /// recursion; re-entering one of them means a dependency cycle.
    pub(crate) fn enable_in<'a>(
        &'a self,
        state: &'a mut RegistryState,
        name: &'a str,
        with_dependencies: bool,
        trail: &'a mut Vec<String>,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let dependencies = state.require(name)?.info.plugin_dependencies.clone();
            if trail.iter().any(|n| n == name) {
                warn!(plugin = name, chain = ?trail, "Plugin dependency cycle, skipping");
                return Ok(());
            }

            trail.push(name.to_string());
            let outcome = async {
                if with_dependencies {
                    for dependency in &dependencies {
                        self.enable_in(state, dependency, true, trail)
                            .await
                            .map_err(|e| {
                                AppError::dependency_failure(
                                    format!(
                                        "Plugin '{name}' requires '{dependency}', which could not be enabled"
                                    ),
                                    e,
                                )
                            })?;
                    }
                }
                self.activate(state, name).await
            }
            .await;
            trail.pop();
            outcome
        })
    }

    /// Disables `name`, with its declared dependencies first when requested.
    pub(crate) fn disable_in<'a>(
        &'a self,
        state: &'a mut RegistryState,
        name: &'a str,
        with_dependencies: bool,
        trail: &'a mut Vec<String>,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let dependencies = state.require(name)?.info.plugin_dependencies.clone();
            if trail.iter().any(|n| n == name) {
                warn!(plugin = name, chain = ?trail, "Plugin dependency cycle, skipping");
                return Ok(());
            }

            trail.push(name.to_string());
            let outcome = async {
                if with_dependencies {
                    for dependency in &dependencies {
                        self.disable_in(state, dependency, true, trail)
                            .await
                            .map_err(|e| {
                                AppError::dependency_failure(
                                    format!(
                                        "Dependency '{dependency}' of plugin '{name}' could not be disabled"
                                    ),
                                    e,
                                )
                            })?;
                    }
                }
                if state.is_enabled(name) {
                    self.deactivate(state, name).await?;
                }
                Ok(())
            }
            .await;
            trail.pop();
            outcome
        })
    }

    async fn activate(&self, state: &mut RegistryState, name: &str) -> AppResult<()> {
        if state.is_enabled(name) {
            debug!(plugin = name, "Plugin already enabled");
            return Ok(());
        }

        let packages = state.require(name)?.info.package_dependencies.clone();
        if !packages.is_empty() {
            install_packages(self.installer.as_ref(), name, &packages).await;
        }

        self.install_in(state, name).await?;
        state.mark_enabled(name)?;
        self.persist(name, DescriptorPatch::status(PluginStatus::Enabled))
            .await?;

        info!(plugin = name, "Plugin enabled");
        Ok(())
    }

    async fn deactivate(&self, state: &mut RegistryState, name: &str) -> AppResult<()> {
        state.mark_disabled(name)?;
        self.persist(name, DescriptorPatch::status(PluginStatus::Disabled))
            .await?;

        info!(plugin = name, "Plugin disabled");
        Ok(())
    }

    async fn persist(&self, name: &str, patch: DescriptorPatch) -> AppResult<()> {
        self.store
            .update_by_name(name, &patch)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::Persistence => e,
                _ => AppError::with_source(
                    ErrorKind::Persistence,
                    format!("Failed to persist plugin '{name}'"),
                    e,
                ),
            })
    }
}
