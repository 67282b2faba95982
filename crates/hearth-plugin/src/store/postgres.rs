//! [`DescriptorStore`] backed by the PostgreSQL `plugins` table.

use async_trait::async_trait;

use hearth_core::result::AppResult;
use hearth_database::repositories::PluginRepository;
use hearth_entity::plugin::{DescriptorPatch, PluginDescriptor};

use super::DescriptorStore;

#[async_trait]
impl DescriptorStore for PluginRepository {
    async fn list(&self) -> AppResult<Vec<PluginDescriptor>> {
        self.find_all().await
    }

    async fn replace_all(&self, descriptors: &[PluginDescriptor]) -> AppResult<()> {
        PluginRepository::replace_all(self, descriptors).await
    }

    async fn update_by_name(&self, name: &str, patch: &DescriptorPatch) -> AppResult<()> {
        PluginRepository::update_by_name(self, name, patch).await
    }
}
