//! WHERE predicates.
//!
//! Values are escaped when a predicate is created, never at render time, so
//! a stored filter always holds SQL-safe text. Raw fragments are the one
//! exception and are trusted as given.

use crate::dialect::Dialect;
use tmorm_core::{Value, quote_qualified};

/// What kind of predicate a filter is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// `table.field = literal`
    SimpleEquality,
    /// Caller-supplied SQL, no escaping
    RawFragment,
    /// `table.field IN (literals)`
    InList,
}

/// A single WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    table: Option<String>,
    field: Option<String>,
    /// Escaped literal, literal list, or raw SQL depending on `kind`.
    value: String,
    kind: FilterKind,
}

impl Filter {
    /// Equality against a value escaped for `dialect`. NULL renders as
    /// `IS NULL`.
    pub fn equals(
        dialect: Dialect,
        table: impl Into<String>,
        field: impl Into<String>,
        value: &Value,
    ) -> Self {
        Self {
            table: Some(table.into()),
            field: Some(field.into()),
            value: dialect.literal(value),
            kind: FilterKind::SimpleEquality,
        }
    }

    /// Membership in a list of escaped values.
    ///
    /// An empty list becomes `IN (NULL)`, which is valid SQL and matches no
    /// row.
    pub fn in_list(
        dialect: Dialect,
        table: impl Into<String>,
        field: impl Into<String>,
        values: &[Value],
    ) -> Self {
        let list = if values.is_empty() {
            "NULL".to_string()
        } else {
            values
                .iter()
                .map(|value| dialect.literal(value))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            table: Some(table.into()),
            field: Some(field.into()),
            value: list,
            kind: FilterKind::InList,
        }
    }

    /// A trusted SQL fragment used as-is.
    ///
    /// Never pass user input here: nothing is escaped.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            table: None,
            field: None,
            value: sql.into(),
            kind: FilterKind::RawFragment,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The stored, already-escaped value text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render this predicate.
    pub fn to_sql(&self) -> String {
        let column = match (&self.table, &self.field) {
            (Some(table), Some(field)) => quote_qualified(table, field),
            _ => String::new(),
        };
        match self.kind {
            FilterKind::SimpleEquality if self.value == "NULL" => format!("{} IS NULL", column),
            FilterKind::SimpleEquality => format!("{} = {}", column, self.value),
            FilterKind::InList => format!("{} IN ({})", column, self.value),
            FilterKind::RawFragment => self.value.clone(),
        }
    }
}
