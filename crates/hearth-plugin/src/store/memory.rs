//! In-process descriptor store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use hearth_core::error::AppError;
use hearth_core::result::AppResult;
use hearth_entity::plugin::{DescriptorPatch, PluginDescriptor};

use super::DescriptorStore;

/// Descriptor store kept in memory; contents are lost on exit.
///
/// Used by tests and by hosts running without a database.
#[derive(Debug, Default)]
pub struct MemoryDescriptorStore {
    rows: RwLock<Vec<PluginDescriptor>>,
}

impl MemoryDescriptorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `descriptors`.
    pub fn with_descriptors(descriptors: Vec<PluginDescriptor>) -> Self {
        Self {
            rows: RwLock::new(descriptors),
        }
    }

    /// Returns a stored descriptor by name.
    pub async fn get(&self, name: &str) -> Option<PluginDescriptor> {
        let rows = self.rows.read().await;
        rows.iter().find(|d| d.name == name).cloned()
    }
}

#[async_trait]
impl DescriptorStore for MemoryDescriptorStore {
    async fn list(&self) -> AppResult<Vec<PluginDescriptor>> {
        Ok(self.rows.read().await.clone())
    }

    async fn replace_all(&self, descriptors: &[PluginDescriptor]) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        *rows = descriptors.to_vec();
        Ok(())
    }

    async fn update_by_name(&self, name: &str, patch: &DescriptorPatch) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| AppError::not_found(format!("Plugin '{name}' is not stored")))?;
        row.apply(patch);
        Ok(())
    }
}
