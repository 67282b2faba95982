//! The `menu` plugin: site navigation entries.

use serde_json::{Value, json};

use hearth_core::result::AppResult;
use hearth_plugin::StaticLoader;

pub const NAME: &str = "menu";

pub(crate) fn register(loader: &StaticLoader) {
    loader.register_fn(NAME, "menu", menu);
}

/// Entries keyed by id so other plugins can override them.
fn menu(_args: Vec<Value>) -> AppResult<Value> {
    Ok(json!({
        "home": { "title": "Home", "path": "/", "weight": 0 },
        "files": { "title": "Files", "path": "/files", "weight": 10 },
    }))
}
