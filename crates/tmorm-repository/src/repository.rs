//! Entity collections.
//!
//! An [`EntityRepository`] is a [`CollectionQuery`] bound to an entity type.
//! Builder methods are reached through `Deref`, so filters, joins and
//! ordering chain directly on the repository. Operations that need rows
//! render the query, and skip the backend entirely when the rendered SQL is
//! the same as last time. With caching on, a cache lookup sits between that
//! check and execution.

use crate::config::{ExecutionMode, RepositoryConfig};
use crate::executor::{self, LazyRows};
use crate::materializer::{EntityFactory, Materializer};
use crate::result_cache::{self, ObjectState, ResultCache, Snapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tmorm_cache::CacheBackend;
use tmorm_core::error::{EmptyCollectionError, TypeError};
use tmorm_core::{
    Attributes, Connection, Entity, Error, IDENTITY_FIELD, Record, Result, Value,
};
use tmorm_query::{CollectionQuery, JoinKind};
use tmorm_schema::MetadataCache;

/// A queryable, materializable collection of `E`.
pub struct EntityRepository<E> {
    query: CollectionQuery,
    config: RepositoryConfig,
    materializer: Materializer<E>,
    cache: Option<ResultCache>,
    last_sql: Option<String>,
    rows: Vec<Attributes>,
    objects: Vec<E>,
    objects_built: bool,
    objects_fetched: bool,
    require_total_rows: bool,
    total_rows: Option<u64>,
    executions: u64,
}

impl EntityRepository<Record> {
    /// Collection of schemaless records over `table`.
    pub fn records(table: impl Into<String>) -> Self {
        let table = table.into();
        let factory_table = table.clone();
        Self::with_table(table, move || Record::new(factory_table.clone()))
    }
}

impl<E: Entity + 'static> EntityRepository<E> {
    /// Collection over the table the factory's entities report.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        let table = factory().table_name().to_string();
        Self::with_table(table, factory)
    }

    /// Collection over an explicit table.
    pub fn with_table<F>(table: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self::from_parts(CollectionQuery::new(table), Arc::new(factory), RepositoryConfig::default())
    }

    /// Replace the configuration. A cache backend must still be attached
    /// with [`set_cache_backend`](Self::set_cache_backend) for caching to
    /// take effect.
    #[must_use]
    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.materializer = Materializer::new(self.factory(), config.missing_identity);
        self.config = config;
        self.forget_results();
        self
    }

    fn from_parts(query: CollectionQuery, factory: EntityFactory<E>, config: RepositoryConfig) -> Self {
        Self {
            query,
            materializer: Materializer::new(factory, config.missing_identity),
            config,
            cache: None,
            last_sql: None,
            rows: Vec::new(),
            objects: Vec::new(),
            objects_built: false,
            objects_fetched: false,
            require_total_rows: false,
            total_rows: None,
            executions: 0,
        }
    }

    fn factory(&self) -> EntityFactory<E> {
        let materializer = self.materializer.clone();
        Arc::new(move || materializer.blank())
    }

    /// A collection of the same entity and table with no conditions.
    fn fresh(&self) -> Self {
        let mut fresh = Self::from_parts(
            CollectionQuery::with_dialect(self.query.table(), self.query.dialect()),
            self.factory(),
            self.config.clone(),
        );
        fresh.cache = self.cache.clone();
        fresh
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Cache materialized result sets in `backend` for `ttl`.
    ///
    /// Caching needs complete result sets, so the execution mode becomes
    /// eager.
    pub fn enable_using_cache(&mut self, backend: Arc<dyn CacheBackend>, ttl: Option<Duration>) -> &mut Self {
        self.config = self.config.clone().cache(ttl);
        self.cache = Some(ResultCache::new(backend));
        self
    }

    /// Attach a backend without changing whether caching is on.
    pub fn set_cache_backend(&mut self, backend: Arc<dyn CacheBackend>) -> &mut Self {
        self.cache = Some(ResultCache::new(backend));
        self
    }

    pub fn disable_cache(&mut self) -> &mut Self {
        self.config = self.config.clone().no_cache();
        self
    }

    /// Choose how rows are fetched. Has no effect while caching is on.
    pub fn set_execution_mode(&mut self, mode: ExecutionMode) -> &mut Self {
        self.config = self.config.clone().execution_mode(mode);
        self
    }

    /// Also count the rows the query matches without its limit and offset
    /// whenever the collection is fetched.
    pub fn set_require_count_rows_without_limits(&mut self, flag: bool) -> &mut Self {
        if flag && !self.require_total_rows {
            self.last_sql = None;
        }
        self.require_total_rows = flag;
        self
    }

    /// Row count recorded by the last fetch, when requested with
    /// [`set_require_count_rows_without_limits`](Self::set_require_count_rows_without_limits).
    pub fn total_selected_rows_without_limit(&self) -> Option<u64> {
        self.total_rows
    }

    /// Number of times this collection sent its query to the backend.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    fn caching(&self) -> Option<&ResultCache> {
        if self.config.cache_enabled {
            self.cache.as_ref()
        } else {
            None
        }
    }

    fn forget_results(&mut self) {
        self.last_sql = None;
        self.rows.clear();
        self.objects.clear();
        self.objects_built = false;
        self.objects_fetched = false;
        self.total_rows = None;
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    fn collect(&mut self, conn: &dyn Connection, build_objects: bool) -> Result<()> {
        let sql = self.query.select_sql(false);

        if self.last_sql.as_deref() == Some(sql.as_str()) {
            if build_objects && !self.objects_built {
                self.objects = self.materializer.materialize(&self.rows)?;
                self.objects_built = true;
                self.objects_fetched = true;
            }
            return Ok(());
        }

        self.forget_results();

        let key = self.caching().map(|_| result_cache::key_for::<E>(&sql));
        let cached = match (self.caching(), &key) {
            (Some(cache), Some(key)) => cache.get(key),
            _ => None,
        };

        if let Some(mut snapshot) = cached {
            if self.require_total_rows && snapshot.total_rows.is_none() {
                snapshot.total_rows = Some(self.count_without_limit(conn)?);
                if let (Some(cache), Some(key)) = (self.caching(), &key) {
                    cache.set(key, &snapshot, self.config.cache_ttl);
                }
            }
            tracing::debug!(table = %self.query.table(), rows = snapshot.rows.len(), "Collection served from cache");
            self.objects = snapshot
                .objects
                .iter()
                .map(|state| self.materializer.restore(state))
                .collect();
            self.rows = snapshot.rows;
            self.total_rows = snapshot.total_rows;
            self.objects_built = true;
            self.objects_fetched = true;
            self.last_sql = Some(sql);
            return Ok(());
        }

        let rows = executor::execute(conn, self.query.table(), &sql, self.config.effective_mode())?
            .into_vec()?;
        self.executions += 1;

        let total_rows = if self.require_total_rows {
            Some(self.count_without_limit(conn)?)
        } else {
            None
        };

        let caching = self.caching().cloned();
        let objects = if build_objects || caching.is_some() {
            Some(self.materializer.materialize(&rows)?)
        } else {
            None
        };

        if let (Some(cache), Some(key)) = (caching, key) {
            let snapshot = Snapshot {
                rows: rows.clone(),
                objects: objects
                    .iter()
                    .flatten()
                    .map(ObjectState::of)
                    .collect(),
                total_rows,
            };
            cache.set(&key, &snapshot, self.config.cache_ttl);
        }

        self.rows = rows;
        self.objects_built = objects.is_some();
        self.objects_fetched = objects.is_some();
        self.objects = objects.unwrap_or_default();
        self.total_rows = total_rows;
        self.last_sql = Some(sql);
        Ok(())
    }

    fn ensure_objects(&mut self, conn: &dyn Connection) -> Result<()> {
        if self.objects.is_empty() {
            self.collect(conn, true)?;
        }
        Ok(())
    }

    fn count_without_limit(&self, conn: &dyn Connection) -> Result<u64> {
        let mut unlimited = self.query.clone();
        unlimited.set_limit(0).set_offset(0);
        let sql = format!("SELECT COUNT(*) FROM ({}) AS counted", unlimited.select_sql(false));
        scalar_count(conn, &sql)
    }

    /// Every materialized object, in row order.
    pub fn as_array_of_objects(&mut self, conn: &dyn Connection) -> Result<&[E]> {
        self.collect(conn, true)?;
        Ok(&self.objects)
    }

    /// Raw fetched rows, identity column included.
    pub fn as_array_of_object_data(&mut self, conn: &dyn Connection) -> Result<&[Attributes]> {
        self.collect(conn, false)?;
        Ok(&self.rows)
    }

    /// Stream objects one row at a time.
    ///
    /// The stream always uses a live statement and leaves the memoized
    /// result set and the cache untouched.
    pub fn stream_objects<'conn>(&self, conn: &'conn dyn Connection) -> Result<ObjectStream<'conn, E>> {
        let sql = self.query.select_sql(false);
        let rows = executor::stream(conn, self.query.table(), &sql)?;
        Ok(ObjectStream {
            rows,
            materializer: self.materializer.clone(),
            index: 0,
        })
    }

    /// Use `objects` as the collection for the next bulk operation.
    ///
    /// Unlike fetched objects, new members here are inserted on save.
    pub fn set_collected_objects(&mut self, objects: Vec<E>) -> &mut Self {
        self.objects = objects;
        self.objects_built = true;
        self.objects_fetched = false;
        self
    }

    /// Drop the memoized and cached result set and fetch again.
    pub fn clear_collection_cache(&mut self, conn: &dyn Connection) -> Result<()> {
        if let Some(cache) = self.caching() {
            let key = result_cache::key_for::<E>(&self.query.select_sql(false));
            cache.delete(&key);
        }
        self.last_sql = None;
        self.collect(conn, true)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// First matching object. The limit is 1 while fetching and is put back
    /// afterwards, also when the fetch fails.
    pub fn first_object(&mut self, conn: &dyn Connection) -> Result<Option<E>> {
        let previous = self.query.limit();
        self.query.set_limit(1);
        let fetched = self.collect(conn, false);
        self.query.set_limit(previous);
        fetched?;

        match self.rows.first() {
            Some(row) => Ok(Some(self.materializer.build(0, row.clone())?)),
            None => Ok(None),
        }
    }

    /// Last object of the full collection.
    pub fn last_object(&mut self, conn: &dyn Connection) -> Result<Option<&E>> {
        Ok(self.as_array_of_objects(conn)?.last())
    }

    /// Number of fetched rows, limit and offset applied.
    pub fn count_of_objects_in_collection(&mut self, conn: &dyn Connection) -> Result<usize> {
        self.collect(conn, false)?;
        Ok(self.rows.len())
    }

    /// Row count of the table with filters, ordering and limit ignored.
    /// Explicit joins and grouping still apply.
    pub fn count_of_max_possible_found_objects_without_filters(&self, conn: &dyn Connection) -> Result<u64> {
        scalar_count(conn, &self.query.select_sql(true))
    }

    pub fn has_any_object_in_collection(&mut self, conn: &dyn Connection) -> Result<bool> {
        Ok(self.first_object(conn)?.is_some())
    }

    pub fn has_exact_count_of_objects(&mut self, conn: &dyn Connection, count: usize) -> Result<bool> {
        Ok(self.count_of_objects_in_collection(conn)? == count)
    }

    /// Identities of the fetched rows.
    pub fn ids(&mut self, conn: &dyn Connection) -> Result<Vec<i64>> {
        self.collect(conn, false)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(IDENTITY_FIELD).and_then(Value::to_identity))
            .collect())
    }

    /// Sum of `field` over the fetched rows.
    ///
    /// Integers sum to `BigInt`; any floating value makes the result a
    /// `Double`. NULL and missing values count as zero.
    pub fn sum_of_one_field(&mut self, conn: &dyn Connection, field: &str) -> Result<Value> {
        self.collect(conn, false)?;

        let mut integral: i64 = 0;
        let mut floating: f64 = 0.0;
        let mut is_floating = false;

        for row in &self.rows {
            match row.get(field) {
                None | Some(Value::Null) => {}
                Some(Value::Double(v)) => {
                    is_floating = true;
                    floating += v;
                }
                Some(Value::Text(text)) => {
                    if let Ok(v) = text.trim().parse::<i64>() {
                        integral = integral.saturating_add(v);
                    } else if let Ok(v) = text.trim().parse::<f64>() {
                        is_floating = true;
                        floating += v;
                    } else {
                        return Err(not_numeric(field, &Value::Text(text.clone())));
                    }
                }
                Some(value) => match value.as_i64() {
                    Some(v) => integral = integral.saturating_add(v),
                    None => return Err(not_numeric(field, value)),
                },
            }
        }

        if is_floating {
            Ok(Value::Double(floating + integral as f64))
        } else {
            Ok(Value::BigInt(integral))
        }
    }

    /// `(key, value)` pairs read through each object's field accessor.
    ///
    /// `key_field` defaults to the identity. Iteration order follows the
    /// rows; a repeated key keeps its first position and takes the later
    /// value.
    pub fn pairs(
        &mut self,
        conn: &dyn Connection,
        value_field: &str,
        key_field: Option<&str>,
    ) -> Result<Vec<(Value, Value)>> {
        let key_field = key_field.unwrap_or(IDENTITY_FIELD);
        self.collect(conn, true)?;

        let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(self.objects.len());
        let mut positions: HashMap<PairKey, usize> = HashMap::with_capacity(self.objects.len());
        for object in &self.objects {
            let key = object.field_value(key_field).unwrap_or(Value::Null);
            let value = object.field_value(value_field).unwrap_or(Value::Null);
            match positions.get(&pair_key(&key)) {
                Some(&position) => pairs[position].1 = value,
                None => {
                    positions.insert(pair_key(&key), pairs.len());
                    pairs.push((key, value));
                }
            }
        }
        Ok(pairs)
    }

    /// First object of this entity type matching every `(field, value)`.
    ///
    /// Conditions already set on this collection are not applied.
    pub fn find_one_by_criteria(&self, conn: &dyn Connection, criteria: &[(&str, Value)]) -> Result<Option<E>> {
        let mut probe = self.fresh();
        for (field, value) in criteria {
            probe.set_where(field, value.clone());
        }
        probe.first_object(conn)
    }

    pub fn find_one_by_id(&self, conn: &dyn Connection, id: i64) -> Result<Option<E>> {
        self.find_one_by_criteria(conn, &[(IDENTITY_FIELD, Value::BigInt(id))])
    }

    /// Column names of the collection's table.
    pub fn table_fields(&self, conn: &dyn Connection, metadata: &mut MetadataCache) -> Result<Vec<String>> {
        metadata.column_names(conn, self.query.table())
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Save every object. Only changed fields are written. Returns how many
    /// objects issued a statement.
    ///
    /// Fetched objects without an identity are skipped, since saving them
    /// would insert copies of their rows.
    pub fn save(&mut self, conn: &dyn Connection) -> Result<usize> {
        self.ensure_objects(conn)?;
        let skip_new = self.objects_fetched;
        let mut saved = 0;
        for (index, object) in self.objects.iter_mut().enumerate() {
            if skip_new && object.is_new() {
                skip_unidentified(object.table_name(), index);
                continue;
            }
            if object.save(conn)? {
                saved += 1;
            }
        }
        tracing::debug!(table = %self.query.table(), saved, "Saved collection");
        Ok(saved)
    }

    /// Toggle a boolean field on every object and save each one.
    /// Fetched objects without an identity are left alone.
    pub fn flip_bool_value(&mut self, conn: &dyn Connection, field: &str) -> Result<()> {
        self.ensure_objects(conn)?;
        let skip_new = self.objects_fetched;
        for (index, object) in self.objects.iter_mut().enumerate() {
            if skip_new && object.is_new() {
                skip_unidentified(object.table_name(), index);
                continue;
            }
            object.flip_bool_value(field);
            object.save(conn)?;
        }
        Ok(())
    }

    /// Delete every object in the collection. Returns how many were deleted.
    pub fn delete_object_collection(&mut self, conn: &dyn Connection) -> Result<usize> {
        self.collect(conn, true)?;
        let mut deleted = 0;
        for object in &mut self.objects {
            object.delete(conn)?;
            deleted += 1;
        }
        tracing::debug!(table = %self.query.table(), deleted, "Deleted collection");
        self.forget_results();
        Ok(deleted)
    }

    /// JSON document `{entity, table, objects}` describing every object.
    pub fn export_as_serialized_data(&mut self, conn: &dyn Connection) -> Result<String> {
        self.ensure_objects(conn)?;
        if self.objects.is_empty() {
            return Err(Error::EmptyCollection(EmptyCollectionError {
                operation: "export_as_serialized_data",
                table: self.query.table().to_string(),
            }));
        }

        let export = Export {
            entity: std::any::type_name::<E>(),
            table: self.query.table(),
            objects: self.objects.iter().map(ObjectState::of).collect(),
        };
        Ok(serde_json::to_string(&export)?)
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Join another collection's table.
    ///
    /// Rows of `other` whose `join_index` equals this collection's
    /// `join_on_key` are joined with the given kind.
    pub fn merge_with_collection(
        &mut self,
        other: &CollectionQuery,
        join_on_key: &str,
        join_index: &str,
        kind: JoinKind,
    ) -> &mut Self {
        self.query
            .add_join_table(other.table(), join_index, join_on_key, kind);
        self
    }
}

#[derive(Serialize)]
struct Export<'a> {
    entity: &'a str,
    table: &'a str,
    objects: Vec<ObjectState>,
}

fn scalar_count(conn: &dyn Connection, sql: &str) -> Result<u64> {
    let row = conn.query_one(sql, &[]).map_err(|e| e.with_sql(sql))?;
    let count = row
        .as_ref()
        .and_then(|row| row.get(0))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Hashable form of a pair key. Integers of either width share a form,
/// matching [`Value::same_as`].
#[derive(Debug, PartialEq, Eq, Hash)]
enum PairKey {
    Null,
    Bool(bool),
    Integer(i64),
    Double(u64),
    Text(String),
    Bytes(Vec<u8>),
    Json(String),
}

fn pair_key(value: &Value) -> PairKey {
    match value {
        Value::Null => PairKey::Null,
        Value::Bool(v) => PairKey::Bool(*v),
        Value::Int(v) => PairKey::Integer(i64::from(*v)),
        Value::BigInt(v) => PairKey::Integer(*v),
        // -0.0 and 0.0 compare equal
        Value::Double(v) if *v == 0.0 => PairKey::Double(0),
        Value::Double(v) => PairKey::Double(v.to_bits()),
        Value::Text(v) => PairKey::Text(v.clone()),
        Value::Bytes(v) => PairKey::Bytes(v.clone()),
        Value::Json(v) => PairKey::Json(v.to_string()),
    }
}

fn skip_unidentified(table: &str, index: usize) {
    tracing::warn!(table, index, "Skipping fetched object without identity");
}

fn not_numeric(field: &str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected: "numeric value",
        actual: format!("{:?}", value),
        column: Some(field.to_string()),
    })
}

impl<E> Deref for EntityRepository<E> {
    type Target = CollectionQuery;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}

impl<E> DerefMut for EntityRepository<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.query
    }
}

impl<E> fmt::Debug for EntityRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRepository")
            .field("entity", &std::any::type_name::<E>())
            .field("query", &self.query)
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("last_sql", &self.last_sql)
            .field("rows", &self.rows.len())
            .field("objects", &self.objects.len())
            .finish_non_exhaustive()
    }
}

/// Objects built one row at a time from a live statement.
pub struct ObjectStream<'conn, E> {
    rows: LazyRows<'conn>,
    materializer: Materializer<E>,
    index: usize,
}

impl<E: Entity> Iterator for ObjectStream<'_, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let index = self.index;
        self.index += 1;
        Some(row.and_then(|row| self.materializer.build(index, row)))
    }
}

impl<E> fmt::Debug for ObjectStream<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("rows", &self.rows)
            .field("index", &self.index)
            .finish()
    }
}
