//! Descriptor store: durable table of plugin descriptors keyed by name.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use hearth_core::result::AppResult;
use hearth_entity::plugin::{DescriptorPatch, PluginDescriptor};

pub use memory::MemoryDescriptorStore;

/// Persistence consumed by the plugin runtime.
///
/// The runtime only calls these methods while holding the registry write
/// lock, so a `replace_all` during reconciliation never interleaves with
/// per-field updates issued by activation calls.
#[async_trait]
pub trait DescriptorStore: Send + Sync + std::fmt::Debug {
    /// All stored descriptors, in stored order.
    async fn list(&self) -> AppResult<Vec<PluginDescriptor>>;

    /// Discard every stored descriptor and write `descriptors` in order.
    async fn replace_all(&self, descriptors: &[PluginDescriptor]) -> AppResult<()>;

    /// Apply a partial update to the descriptor named `name`.
    async fn update_by_name(&self, name: &str, patch: &DescriptorPatch) -> AppResult<()>;
}
