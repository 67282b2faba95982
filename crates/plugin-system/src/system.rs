//! The `system` plugin: core routes and site bootstrap.

use serde_json::{Value, json};
use tracing::info;

use hearth_core::result::AppResult;
use hearth_plugin::StaticLoader;

/// File stem of the unit under `plugins/system`.
pub const NAME: &str = "system";

/// Directory static files are served from.
pub const FILES_DIR: &str = "site/files";

pub(crate) fn register(loader: &StaticLoader) {
    loader.register_fn(NAME, "router", router);
    loader.register_fn(NAME, "install", install);
    loader.register_fn(NAME, "uninstall", uninstall);
}

/// Route table contributed by the core.
fn router(_args: Vec<Value>) -> AppResult<Value> {
    Ok(json!([
        {
            "method": "GET",
            "path": "/files/:filename",
            "handler": "system.files",
            "root": FILES_DIR,
        }
    ]))
}

fn install(_args: Vec<Value>) -> AppResult<Value> {
    info!(plugin = NAME, files = FILES_DIR, "Site bootstrap installed");
    Ok(Value::Null)
}

fn uninstall(_args: Vec<Value>) -> AppResult<Value> {
    info!(plugin = NAME, "Site bootstrap removed");
    Ok(Value::Null)
}
