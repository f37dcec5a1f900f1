//! A cache that never stores anything.

use crate::backend::CacheBackend;
use std::time::Duration;

/// Accepts every write and forgets it immediately. Registering it as the
/// default backend turns result caching off without touching call sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeCache;

impl FakeCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for FakeCache {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> bool {
        true
    }

    fn delete(&self, _key: &str) -> bool {
        false
    }

    fn delete_all(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_cache_stores_nothing() {
        let cache = FakeCache::new();
        assert!(cache.set("k", vec![1], None));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.exists("k"));
        assert!(!cache.delete("k"));
        assert!(cache.delete_all());
    }
}
