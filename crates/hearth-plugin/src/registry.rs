//! Plugin registry: the in-memory authoritative view of all plugins.
//!
//! One [`RegistryState`] per process, guarded by a single `RwLock` in
//! [`PluginRegistry`]. Every mutation (reconcile, install, uninstall,
//! enable, disable) holds the write lock for its whole duration; hook
//! dispatch holds the read lock. Readers therefore never observe the
//! enabled set and the hook cache out of step.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use hearth_core::error::AppError;
use hearth_core::result::AppResult;
use hearth_entity::plugin::{PluginDescriptor, PluginStatus};

use crate::scanner::ScanResult;

/// Registry contents.
#[derive(Debug, Default)]
pub struct RegistryState {
    /// Name → descriptor.
    all: HashMap<String, PluginDescriptor>,
    /// Enabled names in activation order.
    enabled: Vec<String>,
    /// Hook name → implementing plugins in activation order.
    ///
    /// Filled lazily under the read lock, cleared only under the write lock.
    hook_cache: DashMap<String, Vec<String>>,
}

impl RegistryState {
    /// Looks up a descriptor.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.all.get(name)
    }

    /// Looks up a descriptor, failing with `NotFound`.
    pub fn require(&self, name: &str) -> AppResult<&PluginDescriptor> {
        self.all
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("Plugin '{name}' not found")))
    }

    pub(crate) fn require_mut(&mut self, name: &str) -> AppResult<&mut PluginDescriptor> {
        self.all
            .get_mut(name)
            .ok_or_else(|| AppError::not_found(format!("Plugin '{name}' not found")))
    }

    /// Enabled plugin names in activation order.
    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    /// Whether `name` is in the enabled set.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| n == name)
    }

    /// All descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        let mut all: Vec<PluginDescriptor> = self.all.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of known plugins.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether no plugin is known.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Replaces the whole state with reconciled descriptors. The enabled
    /// set is rebuilt from their status, in the given order.
    pub(crate) fn load(&mut self, descriptors: Vec<PluginDescriptor>) {
        self.enabled = descriptors
            .iter()
            .filter(|d| d.is_enabled())
            .map(|d| d.name.clone())
            .collect();
        self.all = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        self.hook_cache.clear();
    }

    pub(crate) fn mark_enabled(&mut self, name: &str) -> AppResult<()> {
        self.require_mut(name)?.status = PluginStatus::Enabled;
        if !self.is_enabled(name) {
            self.enabled.push(name.to_string());
        }
        self.hook_cache.clear();
        Ok(())
    }

    pub(crate) fn mark_disabled(&mut self, name: &str) -> AppResult<()> {
        self.require_mut(name)?.status = PluginStatus::Disabled;
        self.enabled.retain(|n| n != name);
        self.hook_cache.clear();
        Ok(())
    }

    pub(crate) fn set_schema_version(&mut self, name: &str, schema_version: i32) -> AppResult<()> {
        self.require_mut(name)?.schema_version = schema_version;
        Ok(())
    }

    /// Weight only reorders cached implementers at lookup time, so the
    /// cache stays valid.
    pub(crate) fn set_weight(&mut self, name: &str, weight: i32) -> AppResult<()> {
        self.require_mut(name)?.weight = weight;
        Ok(())
    }

    pub(crate) fn cached_implementers(&self, hook: &str) -> Option<Vec<String>> {
        self.hook_cache.get(hook).map(|entry| entry.value().clone())
    }

    pub(crate) fn cache_implementers(&self, hook: &str, names: Vec<String>) {
        self.hook_cache.insert(hook.to_string(), names);
    }

    /// Number of hooks with a cached implementer list.
    pub fn cached_hook_count(&self) -> usize {
        self.hook_cache.len()
    }
}

/// Owner of the registry state and its lock.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access for dispatch and queries.
    pub async fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().await
    }

    /// Exclusive access for mutations.
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().await
    }
}

/// Merges a scan with the stored descriptors.
///
/// The scan is authoritative for `basename`, `filepath` and `info`; the
/// store for `status`, `schema_version` and `weight`. Stored names missing
/// from the scan are dropped. Output order: surviving stored names in
/// stored order, then newly discovered names sorted.
pub fn reconcile(mut scanned: ScanResult, persisted: Vec<PluginDescriptor>) -> Vec<PluginDescriptor> {
    let mut merged = Vec::with_capacity(scanned.len());
    let mut seen = HashSet::new();

    for stored in persisted {
        if !seen.insert(stored.name.clone()) {
            continue;
        }
        let Some(unit) = scanned.remove(&stored.name) else {
            continue;
        };

        let mut descriptor =
            PluginDescriptor::discovered(stored.name, unit.basename, unit.filepath, unit.info);
        descriptor.status = stored.status;
        descriptor.schema_version = stored.schema_version;
        descriptor.weight = stored.weight;

        if descriptor.is_enabled() && !descriptor.is_installed() {
            warn!(
                name = %descriptor.name,
                "Stored plugin is enabled but not installed, marking disabled"
            );
            descriptor.status = PluginStatus::Disabled;
        }
        merged.push(descriptor);
    }

    merged.extend(
        scanned
            .into_iter()
            .map(|(name, unit)| {
                PluginDescriptor::discovered(name, unit.basename, unit.filepath, unit.info)
            }),
    );

    merged
}

#[cfg(test)]
mod tests {
    use hearth_entity::plugin::{PluginInfo, UNINSTALLED};

    use super::*;
    use crate::scanner::ScannedPlugin;

    fn scanned(entries: &[(&str, i32)]) -> ScanResult {
        entries
            .iter()
            .map(|(name, version)| {
                (
                    name.to_string(),
                    ScannedPlugin {
                        basename: name.to_string(),
                        filepath: format!("plugins/{name}"),
                        info: PluginInfo::new(*version),
                    },
                )
            })
            .collect()
    }

    fn stored(name: &str, status: PluginStatus, schema_version: i32, weight: i32) -> PluginDescriptor {
        let mut d = PluginDescriptor::discovered(name, name, "old/path", PluginInfo::new(0));
        d.status = status;
        d.schema_version = schema_version;
        d.weight = weight;
        d
    }

    #[test]
    fn test_reconcile_carries_activation_state() {
        let merged = reconcile(
            scanned(&[("system", 3)]),
            vec![stored("system", PluginStatus::Enabled, 2, 5)],
        );

        assert_eq!(merged.len(), 1);
        let system = &merged[0];
        assert_eq!(system.status, PluginStatus::Enabled);
        assert_eq!(system.schema_version, 2);
        assert_eq!(system.weight, 5);
        assert_eq!(system.filepath, "plugins/system");
        assert_eq!(system.info.version, 3);
    }

    #[test]
    fn test_reconcile_defaults_new_and_drops_removed() {
        let merged = reconcile(
            scanned(&[("menu", 1)]),
            vec![stored("gone", PluginStatus::Enabled, 1, 0)],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "menu");
        assert_eq!(merged[0].status, PluginStatus::Disabled);
        assert_eq!(merged[0].schema_version, UNINSTALLED);
        assert_eq!(merged[0].weight, 0);
    }

    #[test]
    fn test_reconcile_keeps_stored_order_then_new_sorted() {
        let merged = reconcile(
            scanned(&[("alpha", 1), ("menu", 1), ("system", 1), ("zeta", 1)]),
            vec![
                stored("system", PluginStatus::Enabled, 1, 0),
                stored("menu", PluginStatus::Enabled, 1, 0),
            ],
        );

        let names: Vec<&str> = merged.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["system", "menu", "alpha", "zeta"]);
    }

    #[test]
    fn test_reconcile_disables_uninstalled_enabled_rows() {
        let merged = reconcile(
            scanned(&[("menu", 1)]),
            vec![stored("menu", PluginStatus::Enabled, UNINSTALLED, 0)],
        );
        assert_eq!(merged[0].status, PluginStatus::Disabled);
    }

    #[test]
    fn test_load_rebuilds_enabled_in_order() {
        let mut state = RegistryState::default();
        state.cache_implementers("router", vec!["stale".into()]);
        state.load(reconcile(
            scanned(&[("menu", 1), ("system", 1), ("blog", 1)]),
            vec![
                stored("menu", PluginStatus::Enabled, 1, 0),
                stored("blog", PluginStatus::Disabled, 1, 0),
                stored("system", PluginStatus::Enabled, 1, 0),
            ],
        ));

        assert_eq!(state.enabled(), ["menu", "system"]);
        assert_eq!(state.cached_hook_count(), 0);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_mark_enabled_and_disabled_invalidate_cache() {
        let mut state = RegistryState::default();
        state.load(reconcile(scanned(&[("menu", 1)]), Vec::new()));

        state.cache_implementers("menu", Vec::new());
        state.mark_enabled("menu").unwrap();
        assert_eq!(state.enabled(), ["menu"]);
        assert_eq!(state.cached_hook_count(), 0);

        state.mark_enabled("menu").unwrap();
        assert_eq!(state.enabled(), ["menu"]);

        state.cache_implementers("menu", vec!["menu".into()]);
        state.mark_disabled("menu").unwrap();
        assert!(state.enabled().is_empty());
        assert_eq!(state.get("menu").unwrap().status, PluginStatus::Disabled);
        assert_eq!(state.cached_hook_count(), 0);
    }
}
