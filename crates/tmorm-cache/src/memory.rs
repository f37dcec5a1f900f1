//! In-memory cache backend.

use crate::backend::CacheBackend;
use crate::entry::CacheEntry;
use crate::statistics::CacheStatistics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Process-local cache with per-entry expiry.
///
/// Expired entries count as missing and are removed the next time they are
/// looked up, or in bulk by [`cleanup_expired`](Self::cleanup_expired).
#[derive(Debug, Default)]
pub struct MemoryCache {
    store: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every expired entry.
    pub fn cleanup_expired(&self) {
        let mut store = self.store();
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired());
        tracing::trace!(purged = before - store.len(), "Purged expired cache entries");
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let store = self.store();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        CacheStatistics {
            hits,
            misses,
            total_requests: hits + misses,
            entry_count: store.len() as u64,
            memory_usage: store.values().map(|entry| entry.value.len() as u64).sum(),
        }
    }
}

impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut store = self.store();
        let value = match store.get(key).map(CacheEntry::is_expired) {
            Some(true) => {
                store.remove(key);
                None
            }
            Some(false) => store.get(key).map(|entry| entry.value.clone()),
            None => None,
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> bool {
        self.store()
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.store().remove(key).is_some()
    }

    fn delete_all(&self) -> bool {
        self.store().clear();
        true
    }

    fn exists(&self, key: &str) -> bool {
        self.store()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }
}
