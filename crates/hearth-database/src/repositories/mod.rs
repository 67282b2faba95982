//! Repository implementations.

pub mod plugin;

pub use plugin::PluginRepository;
