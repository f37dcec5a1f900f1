//! Entity collections for tmorm.
//!
//! `tmorm-repository` turns a [`CollectionQuery`](tmorm_query::CollectionQuery)
//! into domain objects:
//!
//! - [`executor`] runs the rendered statement eagerly or as a row stream
//! - [`result_cache`] stores fetched sets in a [`CacheBackend`](tmorm_cache::CacheBackend)
//! - [`materializer`] builds entities from rows, splitting off the identity
//! - [`EntityRepository`] ties these together with bulk operations
//!
//! # Example
//!
//! ```
//! use tmorm_core::Entity;
//! use tmorm_query::OrderDirection;
//! use tmorm_repository::EntityRepository;
//! use tmorm_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw(
//!     "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, status TEXT);
//!      INSERT INTO items (name, status) VALUES ('a', 'active'), ('b', 'hidden');",
//! )?;
//!
//! let mut items = EntityRepository::records("items");
//! items
//!     .set_filter_value("status", "active")
//!     .add_order_by_field("name", OrderDirection::Asc);
//!
//! let objects = items.as_array_of_objects(&conn)?;
//! assert_eq!(objects.len(), 1);
//! assert_eq!(objects[0].id(), 1);
//! # Ok::<(), tmorm_core::Error>(())
//! ```

pub mod config;
pub mod executor;
pub mod materializer;
pub mod repository;
pub mod result_cache;

pub use config::{DEFAULT_CACHE_TTL, ExecutionMode, MissingIdentityPolicy, RepositoryConfig};
pub use executor::{LazyRows, RowSet};
pub use materializer::{EntityFactory, Materializer};
pub use repository::{EntityRepository, ObjectStream};
pub use result_cache::{CACHE_KEY_PREFIX, ObjectState, ResultCache, Snapshot, key_for};
