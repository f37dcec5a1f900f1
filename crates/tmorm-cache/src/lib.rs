//! Byte caches for tmorm.
//!
//! - [`CacheBackend`]: the get/set/delete contract with per-entry TTL
//! - [`MemoryCache`]: process-local map with lazy expiry and statistics
//! - [`FakeCache`]: stores nothing, for switching caching off
//! - [`Cacher`]: named backends with a default

pub mod backend;
mod entry;
pub mod fake;
pub mod memory;
pub mod registry;
pub mod statistics;

pub use backend::CacheBackend;
pub use fake::FakeCache;
pub use memory::MemoryCache;
pub use registry::{Cacher, FAKE, MEMORY};
pub use statistics::CacheStatistics;
