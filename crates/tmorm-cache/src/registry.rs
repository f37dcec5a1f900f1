//! Named cache backends.

use crate::backend::CacheBackend;
use crate::fake::FakeCache;
use crate::memory::MemoryCache;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tmorm_core::Error;
use tmorm_core::error::ConfigError;

/// Name of the built-in [`MemoryCache`].
pub const MEMORY: &str = "memory";
/// Name of the built-in [`FakeCache`].
pub const FAKE: &str = "fake";

/// Registry of cache backends with a switchable default.
///
/// A new registry holds `"memory"` (the default) and `"fake"`. The default
/// name always refers to a registered backend.
pub struct Cacher {
    backends: BTreeMap<String, Arc<dyn CacheBackend>>,
    default_name: String,
    default_backend: Arc<dyn CacheBackend>,
}

impl Cacher {
    pub fn new() -> Self {
        let memory: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
        let mut backends: BTreeMap<String, Arc<dyn CacheBackend>> = BTreeMap::new();
        backends.insert(MEMORY.to_string(), Arc::clone(&memory));
        backends.insert(FAKE.to_string(), Arc::new(FakeCache::new()));

        Self {
            backends,
            default_name: MEMORY.to_string(),
            default_backend: memory,
        }
    }

    /// Add or replace a backend.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn CacheBackend>) {
        let name = name.into();
        if name == self.default_name {
            self.default_backend = Arc::clone(&backend);
        }
        tracing::debug!(name = %name, backend = backend.name(), "Registered cache backend");
        self.backends.insert(name, backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CacheBackend>> {
        self.backends.get(name).cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is a configuration error.
    pub fn backend(&self, name: &str) -> Result<Arc<dyn CacheBackend>, Error> {
        self.get(name).ok_or_else(|| {
            Error::Config(ConfigError {
                message: format!("Unknown cache backend '{}'", name),
                source: None,
            })
        })
    }

    pub fn default_backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.default_backend)
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Switch the default backend. Returns `false` for an unknown name.
    pub fn set_default(&mut self, name: &str) -> bool {
        match self.backends.get(name) {
            Some(backend) => {
                self.default_backend = Arc::clone(backend);
                self.default_name = name.to_string();
                true
            }
            None => {
                tracing::warn!(name = %name, "Cannot set unknown cache backend as default");
                false
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    /// Empty every registered backend.
    pub fn clear_all_caches(&self) {
        for (name, backend) in &self.backends {
            if !backend.delete_all() {
                tracing::warn!(name = %name, "Cache backend failed to clear");
            }
        }
        tracing::debug!(count = self.backends.len(), "Cleared all caches");
    }
}

impl Default for Cacher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cacher")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("default", &self.default_name)
            .finish()
    }
}
