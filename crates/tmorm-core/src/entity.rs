//! Entity trait for active-record style domain objects.
//!
//! An entity owns a table name, an integer identity and a mapping of
//! ordinary attributes. The identity never lives in the attribute mapping.
//! Attributes changed through `set_attribute` are remembered as dirty so
//! that `save` only writes what changed.

use crate::Result;
use crate::connection::Connection;
use crate::identifiers::quote_ident;
use crate::row::Attributes;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conventional name of the identity column.
pub const IDENTITY_FIELD: &str = "id";

/// A domain object backed by one table row.
pub trait Entity {
    /// Table the entity is stored in.
    fn table_name(&self) -> &str;

    /// Identity value, `0` for objects never stored.
    fn id(&self) -> i64;

    /// Assign the identity. Does not mark anything dirty.
    fn set_id(&mut self, id: i64);

    /// Read an attribute by field name.
    ///
    /// Implementations may compute derived fields here.
    fn get_attribute(&self, field: &str) -> Option<Value>;

    /// Write an attribute by field name and mark it dirty.
    fn set_attribute(&mut self, field: &str, value: Value);

    /// Replace attributes from a mapping.
    ///
    /// With `mark_dirty` false the loaded values count as the stored state,
    /// so a later `save` does not write them back.
    fn load_data(&mut self, data: Attributes, mark_dirty: bool);

    /// Snapshot of all stored attributes, identity excluded.
    fn attributes(&self) -> Attributes;

    /// Names of attributes changed since the last load or save.
    fn dirty_fields(&self) -> Vec<String>;

    /// Forget pending changes.
    fn clear_dirty(&mut self);

    /// Read a field, treating `id` as the identity.
    fn field_value(&self, field: &str) -> Option<Value> {
        if field == IDENTITY_FIELD {
            Some(Value::BigInt(self.id()))
        } else {
            self.get_attribute(field)
        }
    }

    /// Whether the object has never been stored.
    fn is_new(&self) -> bool {
        self.id() == 0
    }

    /// Toggle a boolean attribute. Missing or NULL counts as false.
    fn flip_bool_value(&mut self, field: &str) {
        let current = self
            .get_attribute(field)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.set_attribute(field, Value::Bool(!current));
    }

    /// Insert or update the row.
    ///
    /// New objects are inserted with every attribute and receive the
    /// generated identity. Stored objects update only their dirty fields;
    /// with nothing dirty no statement is issued. Returns whether a
    /// statement ran.
    fn save(&mut self, conn: &dyn Connection) -> Result<bool> {
        let table = quote_ident(self.table_name());

        if self.is_new() {
            let attributes = self.attributes();
            let id = if attributes.is_empty() {
                conn.insert(&format!("INSERT INTO {} DEFAULT VALUES", table), &[])?
            } else {
                let columns: Vec<String> = attributes.keys().map(|k| quote_ident(k)).collect();
                let placeholders = vec!["?"; attributes.len()].join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders
                );
                let params: Vec<Value> = attributes.into_values().collect();
                conn.insert(&sql, &params)?
            };
            tracing::debug!(table = %self.table_name(), id, "Inserted entity");
            self.set_id(id);
            self.clear_dirty();
            return Ok(true);
        }

        let dirty = self.dirty_fields();
        if dirty.is_empty() {
            tracing::trace!(table = %self.table_name(), id = self.id(), "Nothing to save");
            return Ok(false);
        }

        let mut assignments = Vec::with_capacity(dirty.len());
        let mut params = Vec::with_capacity(dirty.len() + 1);
        for field in &dirty {
            assignments.push(format!("{} = ?", quote_ident(field)));
            params.push(self.get_attribute(field).unwrap_or(Value::Null));
        }
        params.push(Value::BigInt(self.id()));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments.join(", "),
            quote_ident(IDENTITY_FIELD)
        );
        conn.execute(&sql, &params)?;
        tracing::debug!(
            table = %self.table_name(),
            id = self.id(),
            fields = dirty.len(),
            "Updated entity"
        );
        self.clear_dirty();
        Ok(true)
    }

    /// Delete the row. New objects are left untouched.
    fn delete(&mut self, conn: &dyn Connection) -> Result<()> {
        if self.is_new() {
            return Ok(());
        }
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(self.table_name()),
            quote_ident(IDENTITY_FIELD)
        );
        conn.execute(&sql, &[Value::BigInt(self.id())])?;
        tracing::debug!(table = %self.table_name(), id = self.id(), "Deleted entity");
        Ok(())
    }

    /// Reload attributes from the stored row. Returns false when the row
    /// no longer exists.
    fn load_from_db(&mut self, conn: &dyn Connection) -> Result<bool> {
        if self.is_new() {
            return Ok(false);
        }
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            quote_ident(self.table_name()),
            quote_ident(IDENTITY_FIELD)
        );
        let Some(row) = conn.query_one(&sql, &[Value::BigInt(self.id())])? else {
            return Ok(false);
        };
        let mut data = row.into_attributes();
        data.remove(IDENTITY_FIELD);
        self.load_data(data, false);
        self.clear_dirty();
        Ok(true)
    }
}

/// A schemaless entity over any table.
///
/// Attributes are whatever columns the row carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    table: String,
    id: i64,
    attributes: Attributes,
    #[serde(skip)]
    dirty: BTreeSet<String>,
}

impl Record {
    /// Create an empty, unsaved record for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id: 0,
            attributes: Attributes::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Builder-style attribute setter that marks the field dirty.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set_attribute(field, value.into());
        self
    }
}

impl Entity for Record {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn get_attribute(&self, field: &str) -> Option<Value> {
        self.attributes.get(field).cloned()
    }

    fn set_attribute(&mut self, field: &str, value: Value) {
        if field == IDENTITY_FIELD {
            if let Some(id) = value.to_identity() {
                self.id = id;
            }
            return;
        }
        self.attributes.insert(field.to_string(), value);
        self.dirty.insert(field.to_string());
    }

    fn load_data(&mut self, data: Attributes, mark_dirty: bool) {
        for (field, value) in data {
            if field == IDENTITY_FIELD {
                continue;
            }
            if mark_dirty {
                self.dirty.insert(field.clone());
            }
            self.attributes.insert(field, value);
        }
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn dirty_fields(&self) -> Vec<String> {
        self.dirty.iter().cloned().collect()
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}
