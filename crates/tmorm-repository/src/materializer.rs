//! Object materialization.
//!
//! Turns fetched rows into entities. The identity column is taken out of
//! each row and assigned separately, so entity attribute maps never carry
//! it.

use crate::config::MissingIdentityPolicy;
use crate::result_cache::ObjectState;
use std::fmt;
use std::sync::Arc;
use tmorm_core::error::{MaterializationError, TypeError};
use tmorm_core::{Attributes, Entity, Error, IDENTITY_FIELD, Result, Value};

/// Builds fresh, empty entities.
pub type EntityFactory<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Row-to-entity converter.
pub struct Materializer<E> {
    factory: EntityFactory<E>,
    policy: MissingIdentityPolicy,
}

impl<E> Clone for Materializer<E> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            policy: self.policy,
        }
    }
}

impl<E> fmt::Debug for Materializer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materializer")
            .field("entity", &std::any::type_name::<E>())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<E: Entity> Materializer<E> {
    pub fn new(factory: EntityFactory<E>, policy: MissingIdentityPolicy) -> Self {
        Self { factory, policy }
    }

    pub fn policy(&self) -> MissingIdentityPolicy {
        self.policy
    }

    /// A fresh entity from the factory.
    pub fn blank(&self) -> E {
        (self.factory)()
    }

    /// Build one entity per row, preserving row order.
    pub fn materialize(&self, rows: &[Attributes]) -> Result<Vec<E>> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| self.build(index, row.clone()))
            .collect()
    }

    /// Build the entity for row `index`.
    ///
    /// A NULL identity is treated like a missing identity column.
    pub fn build(&self, index: usize, mut row: Attributes) -> Result<E> {
        let id = match row.remove(IDENTITY_FIELD) {
            Some(Value::Null) | None => self.missing_identity(index)?,
            Some(value) => identity(&value)?,
        };

        let mut entity = self.blank();
        entity.load_data(row, false);
        entity.set_id(id);
        Ok(entity)
    }

    fn missing_identity(&self, index: usize) -> Result<i64> {
        match self.policy {
            MissingIdentityPolicy::HardError => Err(Error::Materialization(MaterializationError {
                entity: std::any::type_name::<E>().to_string(),
                row_index: index,
                message: format!("row has no '{}' value", IDENTITY_FIELD),
            })),
            MissingIdentityPolicy::LogAndContinue => {
                tracing::warn!(
                    entity = std::any::type_name::<E>(),
                    row_index = index,
                    "Row has no identity"
                );
                Ok(0)
            }
        }
    }

    /// Rebuild an entity from cached state.
    pub fn restore(&self, state: &ObjectState) -> E {
        let mut entity = self.blank();
        entity.load_data(state.attributes.clone(), false);
        entity.set_id(state.id);
        entity
    }
}

/// Identity from an integer or numeric text column.
fn identity(value: &Value) -> Result<i64> {
    match value {
        Value::Int(_) | Value::BigInt(_) | Value::Text(_) => value.to_identity().ok_or_else(|| {
            Error::Type(TypeError {
                expected: "integer identity",
                actual: format!("{:?}", value),
                column: Some(IDENTITY_FIELD.to_string()),
            })
        }),
        other => Err(Error::Type(TypeError {
            expected: "integer identity",
            actual: format!("{:?}", other),
            column: Some(IDENTITY_FIELD.to_string()),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmorm_core::Record;

    fn records(policy: MissingIdentityPolicy) -> Materializer<Record> {
        Materializer::new(Arc::new(|| Record::new("items")), policy)
    }

    fn row(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identity_is_split_from_attributes() {
        let m = records(MissingIdentityPolicy::HardError);
        let record = m
            .build(0, row(&[("id", Value::Int(7)), ("name", Value::from("x"))]))
            .unwrap();
        assert_eq!(record.id(), 7);
        assert!(!record.attributes().contains_key("id"));
        assert_eq!(record.get_attribute("name"), Some(Value::from("x")));
        assert!(record.dirty_fields().is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let m = records(MissingIdentityPolicy::HardError);
        let rows = vec![
            row(&[("id", Value::Int(3))]),
            row(&[("id", Value::Int(1))]),
            row(&[("id", Value::BigInt(2))]),
        ];
        let ids: Vec<i64> = m.materialize(&rows).unwrap().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_numeric_text_identity() {
        let m = records(MissingIdentityPolicy::HardError);
        let record = m.build(0, row(&[("id", Value::from(" 42 "))])).unwrap();
        assert_eq!(record.id(), 42);
    }

    #[test]
    fn test_bad_identity_type() {
        let m = records(MissingIdentityPolicy::HardError);
        assert!(matches!(
            m.build(0, row(&[("id", Value::from("abc"))])),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            m.build(0, row(&[("id", Value::Double(1.5))])),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_missing_identity_hard_error() {
        let m = records(MissingIdentityPolicy::HardError);
        let rows = vec![row(&[("id", Value::Int(1))]), row(&[("name", Value::from("x"))])];
        match m.materialize(&rows) {
            Err(Error::Materialization(err)) => {
                assert_eq!(err.row_index, 1);
                assert!(err.entity.contains("Record"));
            }
            other => panic!("expected materialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identity_log_and_continue() {
        let m = records(MissingIdentityPolicy::LogAndContinue);
        let objects = m.materialize(&[row(&[("name", Value::from("x"))])]).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id(), 0);
        assert_eq!(objects[0].get_attribute("name"), Some(Value::from("x")));
    }

    #[test]
    fn test_null_identity_follows_policy() {
        let rows = vec![row(&[("id", Value::Null), ("name", Value::from("orphan"))])];

        match records(MissingIdentityPolicy::HardError).materialize(&rows) {
            Err(Error::Materialization(err)) => assert_eq!(err.row_index, 0),
            other => panic!("expected materialization error, got {:?}", other),
        }

        let objects = records(MissingIdentityPolicy::LogAndContinue)
            .materialize(&rows)
            .unwrap();
        assert_eq!(objects[0].id(), 0);
        assert_eq!(objects[0].get_attribute("name"), Some(Value::from("orphan")));
    }

    #[test]
    fn test_restore_from_state() {
        let m = records(MissingIdentityPolicy::HardError);
        let state = ObjectState {
            id: 5,
            attributes: row(&[("name", Value::from("y"))]),
        };
        let record = m.restore(&state);
        assert_eq!(record.id(), 5);
        assert_eq!(ObjectState::of(&record), state);
        assert!(record.dirty_fields().is_empty());
    }
}
