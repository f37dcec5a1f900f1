//! Memoized catalog lookups.
//!
//! A `MetadataCache` remembers what the [`Introspector`] returned so
//! repeated lookups within a session do not hit the catalog again. It is
//! owned by one session and mutated through `&mut self`; call
//! [`refresh`](MetadataCache::refresh) or [`clear`](MetadataCache::clear)
//! after DDL.

use crate::introspect::{ColumnInfo, Introspector};
use std::collections::HashMap;
use tmorm_core::{Connection, Result};

#[derive(Debug, Default, Clone)]
pub struct MetadataCache {
    introspector: Introspector,
    tables: Option<Vec<String>>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    create_sql: HashMap<String, String>,
    enum_pairs: HashMap<(String, String), Vec<(String, String)>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<&[String]> {
        if self.tables.is_none() {
            let names = self.introspector.table_names(conn)?;
            tracing::debug!(count = names.len(), "Cached table list");
            self.tables = Some(names);
        }
        Ok(self.tables.as_deref().unwrap_or_default())
    }

    /// Membership test against the cached table list.
    pub fn table_exists<C: Connection + ?Sized>(&mut self, conn: &C, table: &str) -> Result<bool> {
        Ok(self.table_names(conn)?.iter().any(|name| name == table))
    }

    pub fn columns<C: Connection + ?Sized>(&mut self, conn: &C, table: &str) -> Result<&[ColumnInfo]> {
        if !self.columns.contains_key(table) {
            let columns = self.introspector.columns(conn, table)?;
            tracing::debug!(table = %table, count = columns.len(), "Cached column list");
            self.columns.insert(table.to_string(), columns);
        }
        Ok(self.columns.get(table).map(Vec::as_slice).unwrap_or_default())
    }

    /// Column names of `table` in declaration order.
    pub fn column_names<C: Connection + ?Sized>(&mut self, conn: &C, table: &str) -> Result<Vec<String>> {
        Ok(self
            .columns(conn, table)?
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }

    pub fn create_table_sql<C: Connection + ?Sized>(&mut self, conn: &C, table: &str) -> Result<String> {
        if let Some(sql) = self.create_sql.get(table) {
            return Ok(sql.clone());
        }
        let sql = self.introspector.create_table_sql(conn, table)?;
        self.create_sql.insert(table.to_string(), sql.clone());
        Ok(sql)
    }

    pub fn enum_pairs<C: Connection + ?Sized>(
        &mut self,
        conn: &C,
        table: &str,
        column: &str,
    ) -> Result<Vec<(String, String)>> {
        let key = (table.to_string(), column.to_string());
        if let Some(pairs) = self.enum_pairs.get(&key) {
            return Ok(pairs.clone());
        }
        let pairs = self.introspector.enum_pairs(conn, table, column)?;
        self.enum_pairs.insert(key, pairs.clone());
        Ok(pairs)
    }

    /// `cms_<base>s` when that table exists, otherwise `m_<base>s`.
    pub fn resolve_table_name<C: Connection + ?Sized>(&mut self, conn: &C, base: &str) -> Result<String> {
        let base = base.to_lowercase();
        let core = format!("cms_{}s", base);
        if self.table_exists(conn, &core)? {
            return Ok(core);
        }
        Ok(format!("m_{}s", base))
    }

    /// Forget everything and reload the table list.
    pub fn refresh<C: Connection + ?Sized>(&mut self, conn: &C) -> Result<()> {
        self.clear();
        self.table_names(conn)?;
        Ok(())
    }

    /// Forget everything known about one table.
    pub fn invalidate_table(&mut self, table: &str) {
        self.tables = None;
        self.columns.remove(table);
        self.create_sql.remove(table);
        self.enum_pairs.retain(|(t, _), _| t != table);
    }

    pub fn clear(&mut self) {
        self.tables = None;
        self.columns.clear();
        self.create_sql.clear();
        self.enum_pairs.clear();
    }

    /// Whether the table list is currently cached.
    pub fn has_table_list(&self) -> bool {
        self.tables.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmorm_sqlite::SqliteConnection;

    fn catalog() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "CREATE TABLE cms_pages (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                status TEXT CHECK (status IN ('draft', 'in_review', 'published'))
            );
            CREATE TABLE m_reviews (id INTEGER PRIMARY KEY, body TEXT);",
        )
        .unwrap();
        conn
    }

    // ==================== Tables ====================

    #[test]
    fn test_table_names_sorted_and_cached() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        assert!(!cache.has_table_list());
        assert_eq!(cache.table_names(&conn).unwrap(), ["cms_pages", "m_reviews"]);
        assert!(cache.has_table_list());

        conn.execute_raw("CREATE TABLE later (id INTEGER)").unwrap();
        assert!(!cache.table_exists(&conn, "later").unwrap());

        cache.refresh(&conn).unwrap();
        assert!(cache.table_exists(&conn, "later").unwrap());
    }

    #[test]
    fn test_resolve_table_name() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        assert_eq!(cache.resolve_table_name(&conn, "Page").unwrap(), "cms_pages");
        assert_eq!(cache.resolve_table_name(&conn, "review").unwrap(), "m_reviews");
        assert_eq!(cache.resolve_table_name(&conn, "ghost").unwrap(), "m_ghosts");
    }

    // ==================== Columns ====================

    #[test]
    fn test_columns() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        let columns = cache.columns(&conn, "cms_pages").unwrap();
        assert_eq!(columns.len(), 3);
        assert!(columns[0].primary_key);
        assert_eq!(columns[1].name, "title");
        assert!(!columns[1].nullable);
        assert_eq!(columns[1].default.as_deref(), Some("''"));

        assert_eq!(
            cache.column_names(&conn, "m_reviews").unwrap(),
            vec!["id".to_string(), "body".to_string()]
        );
    }

    #[test]
    fn test_columns_missing_table() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        let err = cache.columns(&conn, "nope").unwrap_err();
        assert!(matches!(
            err,
            tmorm_core::Error::Schema(tmorm_core::error::SchemaError {
                kind: tmorm_core::error::SchemaErrorKind::TableNotFound,
                ..
            })
        ));
    }

    #[test]
    fn test_create_table_sql_single_line() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        let sql = cache.create_table_sql(&conn, "cms_pages").unwrap();
        assert!(sql.starts_with("CREATE TABLE cms_pages ("));
        assert!(!sql.contains('\n'));
        assert!(cache.create_table_sql(&conn, "missing").is_err());
    }

    // ==================== Enum Pairs ====================

    #[test]
    fn test_enum_pairs_from_check_constraint() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        let pairs = cache.enum_pairs(&conn, "cms_pages", "status").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("draft".to_string(), "Draft".to_string()),
                ("in_review".to_string(), "In Review".to_string()),
                ("published".to_string(), "Published".to_string()),
            ]
        );
    }

    #[test]
    fn test_enum_pairs_errors() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        assert!(cache.enum_pairs(&conn, "cms_pages", "missing").is_err());
        assert!(cache.enum_pairs(&conn, "cms_pages", "title").is_err());
    }

    #[test]
    fn test_invalidate_table() {
        let conn = catalog();
        let mut cache = MetadataCache::new();
        cache.columns(&conn, "m_reviews").unwrap();
        conn.execute_raw("ALTER TABLE m_reviews ADD COLUMN rating INTEGER")
            .unwrap();
        assert_eq!(cache.columns(&conn, "m_reviews").unwrap().len(), 2);

        cache.invalidate_table("m_reviews");
        assert_eq!(cache.columns(&conn, "m_reviews").unwrap().len(), 3);
    }
}
