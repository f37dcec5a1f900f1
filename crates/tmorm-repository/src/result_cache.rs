//! Result-set caching for collections.
//!
//! A snapshot holds the fetched rows and the state of the objects built
//! from them, serialized as JSON under a key derived from the entity type
//! and the rendered statement.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tmorm_cache::CacheBackend;
use tmorm_core::{Attributes, Entity};

/// Prefix shared by every collection cache key.
pub const CACHE_KEY_PREFIX: &str = "orm_entity_repository_";

/// Stored form of one materialized object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub id: i64,
    pub attributes: Attributes,
}

impl ObjectState {
    pub fn of<E: Entity + ?Sized>(entity: &E) -> Self {
        Self {
            id: entity.id(),
            attributes: entity.attributes(),
        }
    }
}

/// Everything a collection needs to skip execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub rows: Vec<Attributes>,
    pub objects: Vec<ObjectState>,
    #[serde(default)]
    pub total_rows: Option<u64>,
}

/// Cache key for a collection of `E` rendered as `sql`.
pub fn key_for<E: ?Sized>(sql: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(std::any::type_name::<E>().as_bytes());
    hasher.update(b"_");
    hasher.update(sql.as_bytes());
    format!("{}{:x}", CACHE_KEY_PREFIX, hasher.finalize())
}

/// Snapshot store on top of a byte cache backend.
#[derive(Clone)]
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Look up a snapshot. Undecodable entries count as misses.
    pub fn get(&self, key: &str) -> Option<Snapshot> {
        let bytes = self.backend.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => {
                tracing::trace!(key = %key, backend = self.backend.name(), "Result cache hit");
                Some(snapshot)
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Discarding corrupt cached result set");
                None
            }
        }
    }

    /// Store a snapshot. Returns whether the backend kept it.
    pub fn set(&self, key: &str, snapshot: &Snapshot, ttl: Option<Duration>) -> bool {
        match serde_json::to_vec(snapshot) {
            Ok(bytes) => self.backend.set(key, bytes, ttl),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Could not encode result set for caching");
                false
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.backend.delete(key)
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("backend", &self.backend.name())
            .finish()
    }
}
