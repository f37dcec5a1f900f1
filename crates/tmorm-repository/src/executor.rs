//! Row execution.
//!
//! Runs a rendered statement and hands back rows as attribute maps, either
//! all at once or one per `next()` call from a live statement.

use crate::config::ExecutionMode;
use std::fmt;
use tmorm_core::{Attributes, Connection, Result, Row, RowIter};

/// Rows produced by [`execute`].
pub enum RowSet<'conn> {
    /// Every row, already fetched.
    Eager(Vec<Attributes>),
    /// A forward-only stream over an open statement.
    Lazy(LazyRows<'conn>),
}

impl RowSet<'_> {
    pub fn mode(&self) -> ExecutionMode {
        match self {
            RowSet::Eager(_) => ExecutionMode::Eager,
            RowSet::Lazy(_) => ExecutionMode::Lazy,
        }
    }

    /// Drain into a vector. A lazy set stops at the first failing row.
    pub fn into_vec(self) -> Result<Vec<Attributes>> {
        match self {
            RowSet::Eager(rows) => Ok(rows),
            RowSet::Lazy(rows) => rows.collect(),
        }
    }
}

impl fmt::Debug for RowSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSet::Eager(rows) => f.debug_tuple("Eager").field(&rows.len()).finish(),
            RowSet::Lazy(rows) => f.debug_tuple("Lazy").field(rows).finish(),
        }
    }
}

/// One-shot row stream. Dropping it releases the statement.
pub struct LazyRows<'conn> {
    rows: RowIter<'conn>,
    sql: String,
}

impl LazyRows<'_> {
    /// Statement the stream was opened for.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Iterator for LazyRows<'_> {
    type Item = Result<Attributes>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(row.map(Row::into_attributes).map_err(|e| e.with_sql(&self.sql)))
    }
}

impl fmt::Debug for LazyRows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRows").field("sql", &self.sql).finish()
    }
}

/// Run `sql` against `conn`.
///
/// Backend failures come back as query errors carrying the statement text.
pub fn execute<'conn, C>(conn: &'conn C, table: &str, sql: &str, mode: ExecutionMode) -> Result<RowSet<'conn>>
where
    C: Connection + ?Sized,
{
    tracing::debug!(table = %table, mode = ?mode, sql = %sql, "Executing collection query");

    match mode {
        ExecutionMode::Eager => {
            let rows = conn.query(sql, &[]).map_err(|e| e.with_sql(sql))?;
            tracing::trace!(table = %table, rows = rows.len(), "Fetched rows");
            Ok(RowSet::Eager(
                rows.into_iter().map(Row::into_attributes).collect(),
            ))
        }
        ExecutionMode::Lazy => open_stream(conn, sql).map(RowSet::Lazy),
    }
}

/// Open `sql` as a row stream regardless of any configured mode.
pub fn stream<'conn, C>(conn: &'conn C, table: &str, sql: &str) -> Result<LazyRows<'conn>>
where
    C: Connection + ?Sized,
{
    tracing::debug!(table = %table, mode = ?ExecutionMode::Lazy, sql = %sql, "Streaming collection query");
    open_stream(conn, sql)
}

fn open_stream<'conn, C>(conn: &'conn C, sql: &str) -> Result<LazyRows<'conn>>
where
    C: Connection + ?Sized,
{
    let rows = conn.query_iter(sql, &[]).map_err(|e| e.with_sql(sql))?;
    Ok(LazyRows {
        rows,
        sql: sql.to_string(),
    })
}
