//! JOIN clause types.

use tmorm_core::{quote_ident, quote_qualified};

/// Types of joins a collection can add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    /// Plain `JOIN` with no qualifier.
    Raw,
}

impl JoinKind {
    /// Get the SQL keyword for this join kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Raw => "JOIN",
        }
    }
}

/// A join against another table on `joined.left_key = base.right_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub table: String,
    /// Column of the joined table.
    pub left_key: String,
    /// Column of the base table.
    pub right_key: String,
    pub kind: JoinKind,
}

impl JoinSpec {
    pub fn new(
        table: impl Into<String>,
        left_key: impl Into<String>,
        right_key: impl Into<String>,
        kind: JoinKind,
    ) -> Self {
        Self {
            table: table.into(),
            left_key: left_key.into(),
            right_key: right_key.into(),
            kind,
        }
    }

    /// Render against `base_table`.
    pub fn to_sql(&self, base_table: &str) -> String {
        format!(
            "{} {} ON ({} = {})",
            self.kind.as_str(),
            quote_ident(&self.table),
            quote_qualified(&self.table, &self.left_key),
            quote_qualified(base_table, &self.right_key)
        )
    }
}
