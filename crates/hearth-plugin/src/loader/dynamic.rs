//! Shared-library callback loader using `libloading` (feature-gated).
//!
//! A hook module is a shared library exporting one C symbol per hook:
//!
//! ```c
//! char *router(const char *args_json);
//! void hearth_free_result(char *result);
//! ```
//!
//! Arguments arrive as a JSON array; the returned string is JSON (or NULL
//! for "no result") and is released through `hearth_free_result`.

#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use async_trait::async_trait;
    use dashmap::DashMap;
    use serde_json::Value;
    use tracing::{debug, info, warn};

    use hearth_core::error::AppError;
    use hearth_core::result::AppResult;
    use hearth_entity::plugin::PluginDescriptor;

    use crate::loader::{CallbackLoader, HookCallback};

    /// Signature of an exported hook symbol.
    pub type HookFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;

    /// Signature of the result deallocator every module must export.
    pub type FreeFn = unsafe extern "C" fn(*mut c_char);

    const FREE_SYMBOL: &[u8] = b"hearth_free_result";

    /// Resolves callbacks from shared libraries on disk.
    #[derive(Default)]
    pub struct DynamicLoader {
        /// Opened libraries, kept alive for the lifetime of the loader.
        libraries: DashMap<PathBuf, Arc<libloading::Library>>,
    }

    impl DynamicLoader {
        /// Creates a loader with no open libraries.
        pub fn new() -> Self {
            Self::default()
        }

        fn library(&self, module: &Path) -> AppResult<Arc<libloading::Library>> {
            if let Some(lib) = self.libraries.get(module) {
                return Ok(lib.value().clone());
            }

            // SAFETY: plugin modules are trusted code placed on disk by the
            // site operator; their initialisers run here.
            let lib = unsafe { libloading::Library::new(module) }.map_err(|e| {
                AppError::plugin(format!(
                    "Failed to load plugin library '{}': {e}",
                    module.display()
                ))
            })?;
            info!(path = %module.display(), "Plugin library loaded");

            let lib = Arc::new(lib);
            self.libraries.insert(module.to_path_buf(), lib.clone());
            Ok(lib)
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicLoader")
                .field("loaded_count", &self.libraries.len())
                .finish()
        }
    }

    impl CallbackLoader for DynamicLoader {
        fn resolve(
            &self,
            descriptor: &PluginDescriptor,
            hook: &str,
            module: &Path,
        ) -> Option<Arc<dyn HookCallback>> {
            let library = match self.library(module) {
                Ok(lib) => lib,
                Err(e) => {
                    warn!(plugin = %descriptor.name, error = %e, "Cannot open hook module");
                    return None;
                }
            };

            // SAFETY: the symbol types are the documented module ABI.
            let (hook_fn, free_fn) = unsafe {
                let hook_fn = *library.get::<HookFn>(hook.as_bytes()).ok()?;
                let free_fn = match library.get::<FreeFn>(FREE_SYMBOL) {
                    Ok(symbol) => *symbol,
                    Err(e) => {
                        warn!(
                            plugin = %descriptor.name,
                            error = %e,
                            "Hook module does not export hearth_free_result"
                        );
                        return None;
                    }
                };
                (hook_fn, free_fn)
            };

            debug!(plugin = %descriptor.name, hook, "Resolved dynamic hook");
            Some(Arc::new(LibraryCallback {
                hook: hook.to_string(),
                hook_fn,
                free_fn,
                library,
            }))
        }
    }

    /// A hook symbol bound to the library that owns it.
    struct LibraryCallback {
        hook: String,
        hook_fn: HookFn,
        free_fn: FreeFn,
        library: Arc<libloading::Library>,
    }

    impl std::fmt::Debug for LibraryCallback {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LibraryCallback")
                .field("hook", &self.hook)
                .finish()
        }
    }

    #[async_trait]
    impl HookCallback for LibraryCallback {
        async fn call(&self, args: &[Value]) -> AppResult<Value> {
            let payload = CString::new(serde_json::to_string(args)?).map_err(|e| {
                AppError::plugin(format!("Hook arguments contain a NUL byte: {e}"))
            })?;
            let hook_fn = self.hook_fn;
            let free_fn = self.free_fn;
            let library = self.library.clone();

            let output = tokio::task::spawn_blocking(move || {
                let _library = library;
                // SAFETY: `payload` outlives the call and the returned
                // pointer is released with the module's own deallocator.
                unsafe {
                    let raw = hook_fn(payload.as_ptr());
                    if raw.is_null() {
                        return None;
                    }
                    let text = CStr::from_ptr(raw).to_string_lossy().into_owned();
                    free_fn(raw);
                    Some(text)
                }
            })
            .await
            .map_err(|e| AppError::plugin(format!("Hook '{}' panicked: {e}", self.hook)))?;

            match output {
                None => Ok(Value::Null),
                Some(text) => serde_json::from_str(&text).map_err(|e| {
                    AppError::plugin(format!("Hook '{}' returned invalid JSON: {e}", self.hook))
                }),
            }
        }
    }
}

/// Stub loader when the `dynamic` feature is not enabled.
#[cfg(not(feature = "dynamic"))]
pub mod dynamic_loader {
    use std::path::Path;
    use std::sync::Arc;

    use hearth_entity::plugin::PluginDescriptor;

    use crate::loader::{CallbackLoader, HookCallback};

    /// Stub dynamic loader; resolves nothing.
    #[derive(Debug, Default)]
    pub struct DynamicLoader;

    impl DynamicLoader {
        /// Creates a stub loader.
        pub fn new() -> Self {
            Self
        }
    }

    impl CallbackLoader for DynamicLoader {
        fn resolve(
            &self,
            _descriptor: &PluginDescriptor,
            _hook: &str,
            _module: &Path,
        ) -> Option<Arc<dyn HookCallback>> {
            None
        }
    }
}

pub use dynamic_loader::DynamicLoader;
