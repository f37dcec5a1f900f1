//! The contract every cache backend implements.

use std::time::Duration;

/// A key/value store for opaque byte payloads.
///
/// Methods take `&self` so one backend can be shared through an `Arc`
/// between the registry and every collection that caches results.
/// Failures are reported as `false`/`None` rather than errors: a cache that
/// cannot answer behaves like an empty cache.
pub trait CacheBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fetch a live entry.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`. `None` ttl means the entry never expires.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> bool;

    /// Remove one entry. Returns whether it was present.
    fn delete(&self, key: &str) -> bool;

    /// Remove every entry.
    fn delete_all(&self) -> bool;

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
