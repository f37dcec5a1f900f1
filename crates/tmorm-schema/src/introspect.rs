//! Database introspection.
//!
//! Reads table lists, column descriptions and CREATE statements from a
//! SQLite catalog, and parses enumerated column declarations into
//! value/label pairs.

use regex::Regex;
use std::sync::LazyLock;
use tmorm_core::error::{SchemaError, SchemaErrorKind};
use tmorm_core::{Connection, Error, Result, Value, quote_ident};

// ============================================================================
// Schema Types
// ============================================================================

/// Information about a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// SQL type as declared
    pub sql_type: String,
    /// Whether the column is nullable
    pub nullable: bool,
    /// Default value expression
    pub default: Option<String>,
    /// Whether this is part of the primary key
    pub primary_key: bool,
}

/// Stateless catalog reader for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Introspector;

impl Introspector {
    pub fn new() -> Self {
        Self
    }

    /// List user tables, sorted by name. SQLite's own tables are excluded.
    pub fn table_names<C: Connection + ?Sized>(&self, conn: &C) -> Result<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
        let rows = conn.query(sql, &[])?;

        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(0).and_then(|v| v.as_str().map(String::from)))
            .collect();

        tracing::trace!(count = names.len(), "Listed tables");
        Ok(names)
    }

    pub fn table_exists<C: Connection + ?Sized>(&self, conn: &C, table: &str) -> Result<bool> {
        let row = conn.query_one(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?",
            &[Value::from(table)],
        )?;
        Ok(row.is_some())
    }

    /// Describe the columns of `table` in declaration order.
    pub fn columns<C: Connection + ?Sized>(&self, conn: &C, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = conn.query(&sql, &[])?;

        if rows.is_empty() {
            return Err(table_not_found(table));
        }

        let columns = rows
            .iter()
            .filter_map(|row| {
                let name = row.get_named::<String>("name").ok()?;
                let sql_type = row.get_named::<String>("type").unwrap_or_default();
                let notnull = row.get_named::<i64>("notnull").unwrap_or(0);
                let default = row.get_named::<Option<String>>("dflt_value").ok().flatten();
                let pk = row.get_named::<i64>("pk").unwrap_or(0);

                Some(ColumnInfo {
                    name,
                    sql_type,
                    nullable: notnull == 0,
                    default,
                    primary_key: pk > 0,
                })
            })
            .collect();

        Ok(columns)
    }

    /// The stored CREATE statement for a table or view, on one line.
    pub fn create_table_sql<C: Connection + ?Sized>(&self, conn: &C, table: &str) -> Result<String> {
        let row = conn.query_one(
            "SELECT sql FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
            &[Value::from(table)],
        )?;

        let sql = row
            .and_then(|row| row.get_named::<Option<String>>("sql").ok().flatten())
            .ok_or_else(|| table_not_found(table))?;

        Ok(strip_line_breaks(&sql))
    }

    /// Allowed values of an enumerated column with display labels.
    ///
    /// The values come from an `enum('a','b')` type declaration or, failing
    /// that, from a `CHECK (column IN ('a','b'))` constraint in the table's
    /// CREATE statement.
    pub fn enum_pairs<C: Connection + ?Sized>(
        &self,
        conn: &C,
        table: &str,
        column: &str,
    ) -> Result<Vec<(String, String)>> {
        let columns = self.columns(conn, table)?;
        let info = columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                Error::Schema(SchemaError {
                    kind: SchemaErrorKind::ColumnNotFound,
                    message: format!("Column '{}' not found in table '{}'", column, table),
                })
            })?;

        let values = match parse_enum_declaration(&info.sql_type) {
            Some(values) => values,
            None => {
                let create_sql = self.create_table_sql(conn, table)?;
                parse_check_in_list(&create_sql, &info.name).ok_or_else(|| {
                    Error::Schema(SchemaError {
                        kind: SchemaErrorKind::Invalid,
                        message: format!(
                            "Column '{}.{}' has no enumerated values",
                            table, column
                        ),
                    })
                })?
            }
        };

        Ok(values
            .into_iter()
            .map(|value| {
                let label = title_label(&value);
                (value, label)
            })
            .collect())
    }

    /// Find the physical table for an entity base name.
    ///
    /// Core tables are named `cms_<base>s`, module tables `m_<base>s`. The
    /// `cms_` form wins when both exist.
    pub fn resolve_table_name<C: Connection + ?Sized>(&self, conn: &C, base: &str) -> Result<String> {
        let base = base.to_lowercase();
        let core = format!("cms_{}s", base);
        if self.table_exists(conn, &core)? {
            return Ok(core);
        }
        Ok(format!("m_{}s", base))
    }
}

fn table_not_found(table: &str) -> Error {
    Error::Schema(SchemaError {
        kind: SchemaErrorKind::TableNotFound,
        message: format!("Table '{}' not found", table),
    })
}

static QUOTED_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'((?:[^']|'')*)'").expect("QUOTED_LITERAL: invalid regex pattern")
});

static ENUM_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*enum\s*\((.*)\)\s*$").expect("ENUM_DECLARATION: invalid regex pattern")
});

static CHECK_IN_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)CHECK\s*\(\s*[`"\[]?([^\s`"\[\]()]+)[`"\]]?\s+IN\s*\(((?:[^()']|'(?:[^']|'')*')*)\)\s*\)"#,
    )
    .expect("CHECK_IN_LIST: invalid regex pattern")
});

/// Remove carriage returns, newlines and tabs.
pub fn strip_line_breaks(sql: &str) -> String {
    sql.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect()
}

/// Quoted literals in a list such as `'a', 'it''s'`, unescaped.
fn quoted_literals(list: &str) -> Vec<String> {
    QUOTED_LITERAL
        .captures_iter(list)
        .map(|cap| cap[1].replace("''", "'"))
        .collect()
}

/// Parse an `enum('a','b')` type declaration.
pub fn parse_enum_declaration(sql_type: &str) -> Option<Vec<String>> {
    ENUM_DECLARATION
        .captures(sql_type)
        .map(|cap| quoted_literals(&cap[1]))
}

/// Parse a `CHECK (column IN ('a','b'))` constraint for `column` out of a
/// CREATE statement.
pub fn parse_check_in_list(create_sql: &str, column: &str) -> Option<Vec<String>> {
    CHECK_IN_LIST
        .captures_iter(create_sql)
        .find(|cap| cap[1].eq_ignore_ascii_case(column))
        .map(|cap| quoted_literals(&cap[2]))
}

/// Human label for an enum value: separators become spaces and each word
/// is capitalized, e.g. `in_progress` becomes `In Progress`.
pub fn title_label(value: &str) -> String {
    value
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
