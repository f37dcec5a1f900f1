//! SQLite connection implementation.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the `Connection` trait from tmorm-core. Queries can be fetched eagerly
//! into a `Vec<Row>` or streamed through a [`RowStream`] that steps the
//! statement one row at a time.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::result_large_err)] // Error type is defined in tmorm-core
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers
#![allow(clippy::if_not_else)] // Clearer for error handling

use crate::ffi;
use crate::types;
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tmorm_core::{
    Connection, Error, Row, RowIter, TransactionBehavior, Value,
    error::{
        ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind, TransactionError,
        TransactionErrorKind,
    },
    row::Columns,
};

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
    /// Open in multi-thread mode (connections not shared between threads).
    pub no_mutex: bool,
    /// Open in serialized mode (connections can be shared).
    pub full_mutex: bool,
    /// Enable shared cache mode.
    pub shared_cache: bool,
    /// Disable shared cache mode.
    pub private_cache: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= ffi::SQLITE_OPEN_NOMUTEX;
        }
        if self.full_mutex {
            flags |= ffi::SQLITE_OPEN_FULLMUTEX;
        }
        if self.shared_cache {
            flags |= ffi::SQLITE_OPEN_SHAREDCACHE;
        }
        if self.private_cache {
            flags |= ffi::SQLITE_OPEN_PRIVATECACHE;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Inner state of the SQLite connection, protected by a mutex for thread safety.
struct SqliteInner {
    db: *mut ffi::sqlite3,
    in_transaction: bool,
}

// SAFETY: SQLite handles can be sent between threads when access is
// serialized. Every use goes through the Mutex below.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
///
/// This is a thread-safe wrapper around a SQLite database handle.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

// SqliteConnection is Send + Sync because all access goes through the Mutex
unsafe impl Send for SqliteConnection {}
unsafe impl Sync for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("in_transaction", &self.lock().in_transaction)
            .finish()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = errmsg(db);
                    ffi::sqlite3_close(db);
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            tracing::warn!(path = %config.path, error = %msg, "Failed to open SQLite database");
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, ms);
            }
        }

        tracing::debug!(path = %config.path, sqlite = ffi::version(), "Opened SQLite database");

        Ok(Self {
            inner: Mutex::new(SqliteInner {
                db,
                in_transaction: false,
            }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (for DDL, etc.)
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(inner.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg is valid until freed below
                let msg = unsafe { CStr::from_ptr(errmsg).to_string_lossy().into_owned() };
                unsafe { ffi::sqlite3_free(errmsg.cast()) };
                msg
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Query(QueryError {
                kind: error_code_to_kind(rc),
                sql: Some(sql.to_string()),
                message: msg,
                source: None,
            }));
        }

        tracing::trace!(sql = %sql, "Executed raw SQL");
        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> i32 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) }
    }

    /// Prepare and execute a query, returning all rows.
    pub fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let inner = self.lock();
        let stmt = prepare_bound(inner.db, sql, params)?;
        let columns = column_info(stmt);

        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt) };
            match rc {
                ffi::SQLITE_ROW => rows.push(read_row(stmt, &columns)),
                ffi::SQLITE_DONE => break,
                _ => {
                    let err = step_error(inner.db, sql);
                    // SAFETY: stmt is valid
                    unsafe { ffi::sqlite3_finalize(stmt) };
                    return Err(err);
                }
            }
        }

        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };

        tracing::trace!(sql = %sql, rows = rows.len(), "Query completed");
        Ok(rows)
    }

    /// Prepare a query and return a stream that fetches one row per step.
    pub fn query_stream(&self, sql: &str, params: &[Value]) -> Result<RowStream<'_>, Error> {
        let inner = self.lock();
        let stmt = prepare_bound(inner.db, sql, params)?;
        let columns = column_info(stmt);
        drop(inner);

        tracing::trace!(sql = %sql, "Opened row stream");
        Ok(RowStream {
            conn: self,
            stmt,
            columns,
            sql: sql.to_string(),
            finished: false,
        })
    }

    /// Prepare and execute a statement, returning rows affected.
    pub fn execute_sync(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        let inner = self.lock();
        let stmt = prepare_bound(inner.db, sql, params)?;

        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt) };

        let result = match rc {
            ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
                // SAFETY: db is valid
                let changes = unsafe { ffi::sqlite3_changes(inner.db) };
                Ok(u64::try_from(changes).unwrap_or(0))
            }
            _ => Err(step_error(inner.db, sql)),
        };

        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_finalize(stmt) };

        if let Ok(changes) = &result {
            tracing::trace!(sql = %sql, changes, "Statement executed");
        }
        result
    }

    /// Execute an INSERT and return the last inserted rowid.
    pub fn insert_sync(&self, sql: &str, params: &[Value]) -> Result<i64, Error> {
        self.execute_sync(sql, params)?;
        Ok(self.last_insert_rowid())
    }

    /// Begin a transaction.
    pub fn begin_sync(&self, behavior: TransactionBehavior) -> Result<(), Error> {
        let inner = self.lock();
        if inner.in_transaction {
            return Err(transaction_error(
                TransactionErrorKind::AlreadyActive,
                "Already in a transaction",
            ));
        }

        drop(inner); // Release lock before calling execute_raw
        self.execute_raw(behavior.begin_sql())?;

        self.lock().in_transaction = true;
        tracing::debug!(path = %self.path, behavior = ?behavior, "Transaction started");
        Ok(())
    }

    /// Commit the current transaction.
    pub fn commit_sync(&self) -> Result<(), Error> {
        self.finish_transaction("COMMIT")
    }

    /// Rollback the current transaction.
    pub fn rollback_sync(&self) -> Result<(), Error> {
        self.finish_transaction("ROLLBACK")
    }

    fn finish_transaction(&self, statement: &'static str) -> Result<(), Error> {
        let inner = self.lock();
        if !inner.in_transaction {
            return Err(transaction_error(
                TransactionErrorKind::NotActive,
                "Not in a transaction",
            ));
        }

        drop(inner);
        self.execute_raw(statement)?;

        self.lock().in_transaction = false;
        tracing::debug!(path = %self.path, statement, "Transaction finished");
        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        if !inner.db.is_null() {
            // SAFETY: db is valid; close_v2 defers until open statements finalize
            unsafe {
                ffi::sqlite3_close_v2(inner.db);
            }
        }
    }
}

/// A lazily-stepped result set.
///
/// Each call to `next` steps the prepared statement once. The stream is
/// one-shot and forward-only; dropping it finalizes the statement.
pub struct RowStream<'conn> {
    conn: &'conn SqliteConnection,
    stmt: *mut ffi::sqlite3_stmt,
    columns: Arc<Columns>,
    sql: String,
    finished: bool,
}

impl RowStream<'_> {
    /// Column metadata shared by every row of the stream.
    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let inner = self.conn.lock();
        // SAFETY: stmt stays valid until drop
        let rc = unsafe { ffi::sqlite3_step(self.stmt) };
        match rc {
            ffi::SQLITE_ROW => Some(Ok(read_row(self.stmt, &self.columns))),
            ffi::SQLITE_DONE => {
                self.finished = true;
                None
            }
            _ => {
                self.finished = true;
                Some(Err(step_error(inner.db, &self.sql)))
            }
        }
    }
}

impl Drop for RowStream<'_> {
    fn drop(&mut self) {
        let _inner = self.conn.lock();
        // SAFETY: stmt is valid and finalized exactly once
        unsafe { ffi::sqlite3_finalize(self.stmt) };
    }
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        self.query_sync(sql, params)
    }

    fn query_iter<'conn>(
        &'conn self,
        sql: &str,
        params: &[Value],
    ) -> Result<RowIter<'conn>, Error> {
        Ok(Box::new(self.query_stream(sql, params)?))
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        let mut stream = self.query_stream(sql, params)?;
        stream.next().transpose()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        self.execute_sync(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, Error> {
        self.insert_sync(sql, params)
    }

    fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        SqliteConnection::execute_raw(self, sql)
    }

    fn begin(&self, behavior: TransactionBehavior) -> Result<(), Error> {
        self.begin_sync(behavior)
    }

    fn commit(&self) -> Result<(), Error> {
        self.commit_sync()
    }

    fn rollback(&self) -> Result<(), Error> {
        self.rollback_sync()
    }

    fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }
}

// Helper functions

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<*mut ffi::sqlite3_stmt, Error> {
    let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    let len = c_int::try_from(c_sql.as_bytes().len()).unwrap_or(c_int::MAX);

    // SAFETY: All pointers are valid
    let rc = unsafe { ffi::sqlite3_prepare_v2(db, c_sql.as_ptr(), len, &mut stmt, ptr::null_mut()) };

    if rc != ffi::SQLITE_OK {
        return Err(prepare_error(db, sql));
    }

    Ok(stmt)
}

/// Prepare `sql` and bind `params` positionally, finalizing on failure.
fn prepare_bound(
    db: *mut ffi::sqlite3,
    sql: &str,
    params: &[Value],
) -> Result<*mut ffi::sqlite3_stmt, Error> {
    let stmt = prepare_stmt(db, sql)?;

    for (i, param) in params.iter().enumerate() {
        // SAFETY: stmt is valid, index is 1-based
        let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
        if rc != ffi::SQLITE_OK {
            let err = bind_error(db, sql, i + 1);
            // SAFETY: stmt is valid
            unsafe { ffi::sqlite3_finalize(stmt) };
            return Err(err);
        }
    }

    Ok(stmt)
}

fn column_info(stmt: *mut ffi::sqlite3_stmt) -> Arc<Columns> {
    // SAFETY: stmt is valid
    let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
    let names = (0..col_count)
        .map(|i| unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i)))
        .collect();
    Arc::new(Columns::new(names))
}

fn read_row(stmt: *mut ffi::sqlite3_stmt, columns: &Arc<Columns>) -> Row {
    let values = (0..columns.len())
        // SAFETY: stmt just returned SQLITE_ROW and i is in range
        .map(|i| unsafe { types::read_column(stmt, i as c_int) })
        .collect();
    Row::with_columns(Arc::clone(columns), values)
}

/// # Safety
/// `db` must be a valid connection handle.
unsafe fn errmsg(db: *mut ffi::sqlite3) -> String {
    unsafe { CStr::from_ptr(ffi::sqlite3_errmsg(db)).to_string_lossy().into_owned() }
}

fn nul_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn transaction_error(kind: TransactionErrorKind, message: &str) -> Error {
    Error::Transaction(TransactionError {
        kind,
        message: message.to_string(),
    })
}

fn prepare_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe { (errmsg(db), ffi::sqlite3_errcode(db)) };

    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        sql: Some(sql.to_string()),
        message: msg,
        source: None,
    })
}

fn bind_error(db: *mut ffi::sqlite3, sql: &str, param_index: usize) -> Error {
    // SAFETY: db is valid
    let msg = unsafe { errmsg(db) };

    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sql: Some(sql.to_string()),
        message: format!("Failed to bind parameter {}: {}", param_index, msg),
        source: None,
    })
}

fn step_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe { (errmsg(db), ffi::sqlite3_errcode(db)) };

    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        sql: Some(sql.to_string()),
        message: msg,
        source: None,
    })
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // Extended codes carry the primary code in the low byte.
    match code & 0xff {
        ffi::SQLITE_ERROR => QueryErrorKind::Syntax,
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_TOOBIG => QueryErrorKind::DataTruncation,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Cancelled,
        _ => QueryErrorKind::Database,
    }
}
