//! Database connection trait.
//!
//! All operations block the calling thread until the backend answers.
//! There is no cancellation: a long statement runs until the driver gives
//! up or the connection is severed.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// How a transaction acquires its locks when it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// Locks are taken on first read/write.
    #[default]
    Deferred,
    /// A write lock is taken immediately.
    Immediate,
    /// An exclusive lock is taken immediately.
    Exclusive,
}

impl TransactionBehavior {
    /// The BEGIN statement for this behavior.
    #[must_use]
    pub const fn begin_sql(&self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// A one-shot, forward-only stream of rows.
///
/// Each call to `next` fetches one row from the backend. Dropping the
/// iterator releases the underlying statement.
pub type RowIter<'conn> = Box<dyn Iterator<Item = Result<Row>> + 'conn>;

/// A blocking database connection.
pub trait Connection {
    /// Execute a query and return every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and stream rows one at a time.
    fn query_iter<'conn>(&'conn self, sql: &str, params: &[Value]) -> Result<RowIter<'conn>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return the number of rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT and return the generated row id.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Run one or more statements without parameters (DDL, pragmas).
    fn execute_raw(&self, sql: &str) -> Result<()>;

    /// Begin a transaction. Fails if one is already open.
    fn begin(&self, behavior: TransactionBehavior) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Check that the connection still answers.
    fn ping(&self) -> Result<()> {
        self.query("SELECT 1", &[]).map(|_| ())
    }
}
