//! tmorm - fluent query collections and entity materialization over SQLite.
//!
//! tmorm provides:
//!
//! - A fluent collection query builder that renders single-line SQL
//! - Eager or streaming row execution against SQLite
//! - Result-set caching keyed by entity type and rendered statement
//! - Entity materialization with the identity kept out of attribute maps
//! - Bulk collection operations: save, delete, pairs, counts, export
//! - Schema introspection with a per-session metadata cache
//!
//! # Quick Start
//!
//! ```
//! use tmorm::prelude::*;
//!
//! let session = Session::connect(SessionConfig::memory())?;
//! session.execute_raw(
//!     "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, status TEXT);
//!      INSERT INTO items (name, status) VALUES ('a', 'active'), ('b', 'active'), ('c', 'hidden');",
//! )?;
//!
//! let mut items = session.records("items")?;
//! items
//!     .set_filter_value("status", "active")
//!     .add_order_by_field("id", OrderDirection::Asc);
//!
//! let pairs = items.pairs(session.connection(), "name", None)?;
//! assert_eq!(
//!     pairs,
//!     vec![
//!         (Value::BigInt(1), Value::from("a")),
//!         (Value::BigInt(2), Value::from("b")),
//!     ]
//! );
//! # Ok::<(), tmorm::Error>(())
//! ```

// Re-export all public types from sub-crates
pub use tmorm_core::{
    Attributes, ConnectPolicy, Connection, Entity, Error, IDENTITY_FIELD, LiteralStyle, Record,
    Result, Row, RowIter, TransactionBehavior, Value, connect_with_retry, escape_value,
    quote_ident,
};

pub use tmorm_query::{
    CollectionQuery, Dialect, Filter, FilterKind, JoinKind, JoinSpec, OrderDirection, OrderSpec,
    Projection,
};

pub use tmorm_sqlite::{OpenFlags, SqliteConfig, SqliteConnection};

pub use tmorm_schema::{ColumnInfo, Introspector, MetadataCache};

pub use tmorm_cache::{CacheBackend, CacheStatistics, Cacher, FakeCache, MemoryCache};

pub use tmorm_repository::{
    EntityRepository, ExecutionMode, MissingIdentityPolicy, ObjectStream, RepositoryConfig,
};

pub mod config;
pub use config::SessionConfig;

// Session management
pub mod session;
pub use session::Session;

/// Prelude module for convenient imports.
///
/// ```
/// use tmorm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Core traits and types
        Connection,
        Entity,
        EntityRepository,
        Error,
        ExecutionMode,
        // Query building
        JoinKind,
        OrderDirection,
        Record,
        RepositoryConfig,
        Result,
        Row,
        // Session
        Session,
        SessionConfig,
        Value,
    };
}
