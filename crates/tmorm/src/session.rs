//! Session management for tmorm.
//!
//! A Session owns one database connection together with the state that
//! belongs to it: the schema metadata cache and the cache backend registry.
//! Repositories created through the session pick up its repository
//! configuration and cache backends.
//!
//! # Example
//!
//! ```
//! use tmorm::prelude::*;
//!
//! let mut session = Session::connect(SessionConfig::memory())?;
//! session.execute_raw("CREATE TABLE cms_pages (id INTEGER PRIMARY KEY, title TEXT)")?;
//! assert_eq!(session.resolve_table_name("page")?, "cms_pages");
//!
//! session.start_transaction()?;
//! session.execute_raw("INSERT INTO cms_pages (title) VALUES ('Home')")?;
//! session.confirm_transaction()?;
//!
//! let mut pages = session.records("cms_pages")?;
//! assert_eq!(pages.count_of_objects_in_collection(session.connection())?, 1);
//! # Ok::<(), tmorm::Error>(())
//! ```

use crate::config::SessionConfig;
use std::sync::Arc;
use tmorm_cache::{CacheBackend, Cacher};
use tmorm_core::error::{ConfigError, TransactionError, TransactionErrorKind};
use tmorm_core::{
    Connection, Entity, Error, Record, Result, TransactionBehavior, connect_with_retry,
};
use tmorm_repository::EntityRepository;
use tmorm_schema::{ColumnInfo, MetadataCache};
use tmorm_sqlite::SqliteConnection;

/// A database connection with its metadata and cache registry.
#[derive(Debug)]
pub struct Session {
    /// The underlying connection
    connection: SqliteConnection,
    /// Memoized catalog lookups for this connection
    metadata: MetadataCache,
    /// Named cache backends
    cacher: Cacher,
    config: SessionConfig,
}

impl Session {
    /// Open the configured database, retrying per the connect policy.
    #[tracing::instrument(level = "debug", skip(config), fields(path = %config.database.path))]
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let connection = connect_with_retry(&config.connect, |attempt| {
            tracing::trace!(attempt, "Opening database");
            SqliteConnection::open(&config.database)
        })?;
        Self::with_connection(connection, config)
    }

    /// Wrap an already open connection.
    pub fn with_connection(connection: SqliteConnection, config: SessionConfig) -> Result<Self> {
        let mut cacher = Cacher::new();
        if !cacher.set_default(&config.default_cache) {
            return Err(Error::Config(ConfigError {
                message: format!("Unknown cache backend '{}'", config.default_cache),
                source: None,
            }));
        }

        tracing::debug!(default_cache = %config.default_cache, "Session ready");
        Ok(Self {
            connection,
            metadata: MetadataCache::new(),
            cacher,
            config,
        })
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &SqliteConnection {
        &self.connection
    }

    /// Consume the session and return the underlying connection.
    pub fn into_connection(self) -> SqliteConnection {
        self.connection
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataCache {
        &mut self.metadata
    }

    pub fn cacher(&self) -> &Cacher {
        &self.cacher
    }

    pub fn cacher_mut(&mut self) -> &mut Cacher {
        &mut self.cacher
    }

    /// Run statements without parameters. DDL should be followed by
    /// [`refresh_metadata`](Self::refresh_metadata).
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        self.connection.execute_raw(sql)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a transaction unless one is already open. Returns whether a
    /// new transaction was started.
    pub fn start_transaction(&self) -> Result<bool> {
        if self.connection.in_transaction() {
            tracing::trace!("Transaction already active");
            return Ok(false);
        }
        self.connection.begin(TransactionBehavior::Deferred)?;
        Ok(true)
    }

    /// Commit the open transaction, if any. Returns whether a commit ran.
    pub fn confirm_transaction(&self) -> Result<bool> {
        if !self.connection.in_transaction() {
            tracing::trace!("No transaction to confirm");
            return Ok(false);
        }
        self.connection.commit()?;
        Ok(true)
    }

    /// Roll back the open transaction. Fails when none is open.
    pub fn cancel_transaction(&self) -> Result<()> {
        if !self.connection.in_transaction() {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                message: "no active transaction to cancel".to_string(),
            }));
        }
        self.connection.rollback()
    }

    pub fn is_transaction_active(&self) -> bool {
        self.connection.in_transaction()
    }

    // ========================================================================
    // Schema
    // ========================================================================

    pub fn table_names(&mut self) -> Result<Vec<String>> {
        Ok(self.metadata.table_names(&self.connection)?.to_vec())
    }

    pub fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.metadata.table_exists(&self.connection, table)
    }

    pub fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self.metadata.columns(&self.connection, table)?.to_vec())
    }

    /// Column names of `table` in declaration order.
    pub fn table_fields(&mut self, table: &str) -> Result<Vec<String>> {
        self.metadata.column_names(&self.connection, table)
    }

    pub fn create_table_sql(&mut self, table: &str) -> Result<String> {
        self.metadata.create_table_sql(&self.connection, table)
    }

    pub fn enum_pairs(&mut self, table: &str, column: &str) -> Result<Vec<(String, String)>> {
        self.metadata.enum_pairs(&self.connection, table, column)
    }

    pub fn resolve_table_name(&mut self, base: &str) -> Result<String> {
        self.metadata.resolve_table_name(&self.connection, base)
    }

    /// Drop cached metadata and reload the table list.
    pub fn refresh_metadata(&mut self) -> Result<()> {
        self.metadata.refresh(&self.connection)
    }

    // ========================================================================
    // Repositories and caches
    // ========================================================================

    /// Backend named `name`, or the session default.
    pub fn cache_backend(&self, name: Option<&str>) -> Result<Arc<dyn CacheBackend>> {
        match name {
            Some(name) => self.cacher.backend(name),
            None => Ok(self.cacher.default_backend()),
        }
    }

    /// Repository over the factory's table with the session's repository
    /// configuration and cache backend.
    pub fn repository<E, F>(&self, factory: F) -> Result<EntityRepository<E>>
    where
        E: Entity + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.configure(EntityRepository::new(factory))
    }

    /// Repository of schemaless records over `table`.
    pub fn records(&self, table: &str) -> Result<EntityRepository<Record>> {
        self.configure(EntityRepository::records(table))
    }

    fn configure<E: Entity + 'static>(&self, repository: EntityRepository<E>) -> Result<EntityRepository<E>> {
        let config = self.config.repository.clone();
        let backend = self.cache_backend(config.cache_backend.as_deref())?;
        let mut repository = repository.with_config(config);
        repository.set_cache_backend(backend);
        Ok(repository)
    }

    /// Empty every registered cache backend.
    pub fn clear_all_caches(&self) {
        self.cacher.clear_all_caches();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmorm_core::error::ConnectionErrorKind;
    use tmorm_core::ConnectPolicy;
    use tmorm_sqlite::SqliteConfig;

    fn session() -> Session {
        let session = Session::connect(SessionConfig::memory()).unwrap();
        session
            .execute_raw("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .unwrap();
        session
    }

    // ==================== Connect ====================

    #[test]
    fn test_connect_memory() {
        let session = Session::connect(SessionConfig::memory()).unwrap();
        assert!(session.connection().ping().is_ok());
        assert_eq!(session.cacher().default_name(), "memory");
    }

    #[test]
    fn test_connect_retries_then_fails() {
        let config = SessionConfig::memory()
            .database(SqliteConfig::file("/nonexistent-dir/deeper/site.db"))
            .connect_policy(ConnectPolicy::new(2, std::time::Duration::ZERO));
        match Session::connect(config) {
            Err(Error::Connection(err)) => {
                assert_eq!(err.kind, ConnectionErrorKind::RetriesExhausted);
            }
            other => panic!("expected connection error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_default_cache() {
        let config = SessionConfig::memory().default_cache("apc");
        assert!(matches!(Session::connect(config), Err(Error::Config(_))));
    }

    // ==================== Transactions ====================

    #[test]
    fn test_transaction_confirm() {
        let session = session();
        assert!(!session.is_transaction_active());
        assert!(session.start_transaction().unwrap());
        assert!(!session.start_transaction().unwrap());
        assert!(session.is_transaction_active());

        session
            .execute_raw("INSERT INTO notes (body) VALUES ('kept')")
            .unwrap();
        assert!(session.confirm_transaction().unwrap());
        assert!(!session.is_transaction_active());
        assert!(!session.confirm_transaction().unwrap());

        let row = session
            .connection()
            .query_one("SELECT COUNT(*) AS n FROM notes", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row.get_named::<i64>("n").unwrap(), 1);
    }

    #[test]
    fn test_transaction_cancel() {
        let session = session();
        session.start_transaction().unwrap();
        session
            .execute_raw("INSERT INTO notes (body) VALUES ('dropped')")
            .unwrap();
        session.cancel_transaction().unwrap();

        let row = session
            .connection()
            .query_one("SELECT COUNT(*) AS n FROM notes", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row.get_named::<i64>("n").unwrap(), 0);

        assert!(matches!(
            session.cancel_transaction(),
            Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                ..
            }))
        ));
    }

    // ==================== Schema ====================

    #[test]
    fn test_schema_lookups_are_cached() {
        let mut session = session();
        assert_eq!(session.table_names().unwrap(), vec!["notes".to_string()]);
        assert_eq!(
            session.table_fields("notes").unwrap(),
            vec!["id".to_string(), "body".to_string()]
        );

        session
            .execute_raw("CREATE TABLE m_reviews (id INTEGER PRIMARY KEY)")
            .unwrap();
        assert!(!session.table_exists("m_reviews").unwrap());
        session.refresh_metadata().unwrap();
        assert!(session.table_exists("m_reviews").unwrap());
        assert_eq!(session.resolve_table_name("review").unwrap(), "m_reviews");
    }

    // ==================== Repositories ====================

    #[test]
    fn test_repository_uses_session_config() {
        let config = SessionConfig::memory()
            .repository(tmorm_repository::RepositoryConfig::new().cache(None));
        let session = Session::connect(config).unwrap();
        session
            .execute_raw("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT); INSERT INTO notes (body) VALUES ('x');")
            .unwrap();

        let mut first = session.records("notes").unwrap();
        assert!(first.config().cache_enabled);
        assert_eq!(first.count_of_objects_in_collection(session.connection()).unwrap(), 1);
        assert_eq!(first.executions(), 1);

        let mut second = session.records("notes").unwrap();
        assert_eq!(second.count_of_objects_in_collection(session.connection()).unwrap(), 1);
        assert_eq!(second.executions(), 0);

        session.clear_all_caches();
        let mut third = session.records("notes").unwrap();
        third.count_of_objects_in_collection(session.connection()).unwrap();
        assert_eq!(third.executions(), 1);
    }

    #[test]
    fn test_repository_unknown_backend() {
        let config = SessionConfig::memory()
            .repository(tmorm_repository::RepositoryConfig::new().cache_backend("disk"));
        let session = Session::connect(config).unwrap();
        assert!(matches!(session.records("notes"), Err(Error::Config(_))));
    }
}
