//! The engine API: write, cleanup, and index operations over schemas.
//!
//! A [`GraphLoader`] is built once per process around a [`StatementRunner`]
//! and reused by every connector. Each connector run compiles its schemas,
//! writes its records in chunks, then sweeps stale data with the cleanup
//! pass, all under one [`RunParams`] carrying the run's generation tag and
//! tenant identifiers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use surveyor_model::{
    LinkSchema, MatchMode, NodeSchema, PropertyRef, GENERATION_TAG, SCOPE_ID, SCOPE_LABEL,
};

use crate::cleanupbuilder::{build_cleanup_statements, build_link_cleanup_statement};
use crate::error::{GraphError, GraphResult};
use crate::executor::{RetryPolicy, StatementExecutor, StatementRunner};
use crate::indexes::{build_index_statements, build_link_index_statements};
use crate::querybuilder::{build_link_statement, build_node_statement, build_rel_statements};
use crate::statement::{GraphStatement, DICT_LIST, UPDATE_TAG};

/// Tuning knobs for a loader. Defaults match typical inventory volumes.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Records per `$DictList` chunk.
    pub batch_size: usize,
    /// Entities deleted per iterative cleanup pass (`$LIMIT_SIZE`).
    pub cleanup_batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            cleanup_batch_size: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Run-scoped parameters: the generation tag plus named values such as
/// tenant identifiers. One instance is shared by every write and cleanup
/// call of a run, which is what makes the mark-and-sweep generations line
/// up.
#[derive(Debug, Clone)]
pub struct RunParams {
    values: Map<String, Value>,
}

impl RunParams {
    /// Start a run with an explicit generation tag. Tags must increase
    /// across runs; wall-clock seconds are the convention.
    pub fn new(update_tag: i64) -> Self {
        let mut values = Map::new();
        values.insert(GENERATION_TAG.to_string(), Value::from(update_tag));
        Self { values }
    }

    /// Start a run tagged with the current wall-clock time.
    pub fn now() -> Self {
        Self::new(Utc::now().timestamp())
    }

    /// Add a named run parameter, e.g. a tenant id.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn update_tag(&self) -> i64 {
        // Set by both constructors.
        self.values[GENERATION_TAG].as_i64().unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Writes, cleans up, and indexes declarative schemas against the graph.
pub struct GraphLoader {
    executor: StatementExecutor,
    config: LoaderConfig,
    ensured: Mutex<HashSet<String>>,
}

impl GraphLoader {
    pub fn new(runner: Arc<dyn StatementRunner>, config: LoaderConfig) -> Self {
        let executor = StatementExecutor::new(runner, config.retry.clone());
        Self {
            executor,
            config,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Upsert a batch of records for one schema: ensure indexes, validate
    /// the records, then run the node statement and each relationship
    /// statement chunk by chunk. Chunk N+1 starts only after chunk N
    /// committed.
    pub async fn write(
        &self,
        schema: &NodeSchema,
        records: &[Value],
        params: &RunParams,
    ) -> GraphResult<()> {
        self.ensure_indexes(schema).await?;
        validate_records(schema, records)?;
        validate_write_params(schema, params)?;

        let mut queries = vec![build_node_statement(schema)];
        queries.extend(build_rel_statements(schema));

        let chunks = records.chunks(self.config.batch_size.max(1));
        info!(
            schema = %schema.label,
            records = records.len(),
            chunks = chunks.len(),
            "writing batch"
        );
        for chunk in chunks {
            let dict_list = Value::Array(chunk.to_vec());
            for query in &queries {
                let stmt = GraphStatement::new(query.clone())
                    .param(DICT_LIST, dict_list.clone())
                    .merge_parameters(params.as_map());
                self.executor.run(&stmt).await?;
            }
        }
        Ok(())
    }

    /// Upsert cross-reference link records. The run parameters must name the
    /// owning scope, which is stamped onto every written edge.
    pub async fn write_links(
        &self,
        link: &LinkSchema,
        records: &[Value],
        params: &RunParams,
    ) -> GraphResult<()> {
        for name in [SCOPE_LABEL, SCOPE_ID] {
            if params.get(name).is_none() {
                return Err(GraphError::MissingRunParam {
                    name: name.to_string(),
                    context: format!("link '{}' write", link.rel_label),
                });
            }
        }
        self.ensure_link_indexes(link).await?;
        validate_link_records(link, records)?;

        let query = build_link_statement(link);
        info!(link = %link.rel_label, records = records.len(), "writing links");
        for chunk in records.chunks(self.config.batch_size.max(1)) {
            let stmt = GraphStatement::new(query.clone())
                .param(DICT_LIST, Value::Array(chunk.to_vec()))
                .merge_parameters(params.as_map());
            self.executor.run(&stmt).await?;
        }
        Ok(())
    }

    /// Delete everything of this schema still carrying an older generation
    /// tag, scoped through the owning relationship. Refuses to run a
    /// tenant-scoped sweep when any owning-matcher parameter is absent.
    pub async fn cleanup(&self, schema: &NodeSchema, params: &RunParams) -> GraphResult<()> {
        if let Some(owner) = &schema.owning_rel {
            for entry in &owner.matcher {
                if params.get(entry.reference.name()).is_none() {
                    return Err(GraphError::UnscopedCleanup {
                        schema: schema.label.clone(),
                        missing: entry.reference.name().to_string(),
                    });
                }
            }
        }

        info!(schema = %schema.label, update_tag = params.update_tag(), "cleanup");
        for query in build_cleanup_statements(schema) {
            self.run_cleanup_statement(query, params).await?;
        }
        Ok(())
    }

    /// Delete stale cross-reference links within the named scope.
    pub async fn cleanup_links(&self, link: &LinkSchema, params: &RunParams) -> GraphResult<()> {
        for name in [SCOPE_LABEL, SCOPE_ID] {
            if params.get(name).is_none() {
                return Err(GraphError::UnscopedCleanup {
                    schema: link.rel_label.clone(),
                    missing: name.to_string(),
                });
            }
        }

        info!(link = %link.rel_label, update_tag = params.update_tag(), "link cleanup");
        self.run_cleanup_statement(build_link_cleanup_statement(link), params)
            .await
    }

    /// Create the schema's indexes if this process has not already done so.
    pub async fn ensure_indexes(&self, schema: &NodeSchema) -> GraphResult<()> {
        if !self.mark_ensured(&schema.label) {
            return Ok(());
        }
        for query in build_index_statements(schema) {
            debug!(schema = %schema.label, %query, "ensuring index");
            self.executor.run(&GraphStatement::new(query)).await?;
        }
        Ok(())
    }

    /// Create a link's indexes if this process has not already done so.
    pub async fn ensure_link_indexes(&self, link: &LinkSchema) -> GraphResult<()> {
        if !self.mark_ensured(&format!("link:{}", link.rel_label)) {
            return Ok(());
        }
        for query in build_link_index_statements(link) {
            debug!(link = %link.rel_label, %query, "ensuring index");
            self.executor.run(&GraphStatement::new(query)).await?;
        }
        Ok(())
    }

    async fn run_cleanup_statement(&self, query: String, params: &RunParams) -> GraphResult<()> {
        let stmt = GraphStatement::new(query)
            .merge_parameters(params.as_map())
            .param(UPDATE_TAG, params.update_tag())
            .iterative(self.config.cleanup_batch_size.max(1));
        self.executor.run(&stmt).await
    }

    fn mark_ensured(&self, key: &str) -> bool {
        self.ensured
            .lock()
            .expect("ensured-index set is never poisoned")
            .insert(key.to_string())
    }
}

/// Check every record is an object carrying the fields the schema reads.
/// A field may be explicitly `null`; only an absent key is a data error.
/// Fan-out fields are exempt from the presence check but must hold a
/// collection when present.
fn validate_records(schema: &NodeSchema, records: &[Value]) -> GraphResult<()> {
    let mut required: Vec<&str> = Vec::new();
    let mut fan_fields: Vec<&str> = Vec::new();

    for spec in &schema.properties {
        if let PropertyRef::Field(name) = &spec.reference {
            required.push(name);
        }
    }
    for rel in schema.all_rels() {
        for entry in &rel.matcher {
            if let PropertyRef::Field(name) = &entry.reference {
                if entry.mode == MatchMode::FanOut {
                    fan_fields.push(name);
                } else {
                    required.push(name);
                }
            }
        }
        for (_, reference) in &rel.properties {
            if let PropertyRef::Field(name) = reference {
                required.push(name);
            }
        }
    }

    check_records(&schema.label, records, &required, &fan_fields)
}

fn validate_link_records(link: &LinkSchema, records: &[Value]) -> GraphResult<()> {
    let mut required: Vec<&str> = Vec::new();
    for entry in link.source_matcher.iter().chain(&link.target_matcher) {
        if let PropertyRef::Field(name) = &entry.reference {
            required.push(name);
        }
    }
    for (_, reference) in &link.properties {
        if let PropertyRef::Field(name) = reference {
            required.push(name);
        }
    }
    check_records(&link.rel_label, records, &required, &[])
}

fn check_records(
    context: &str,
    records: &[Value],
    required: &[&str],
    fan_fields: &[&str],
) -> GraphResult<()> {
    for record in records {
        let Some(map) = record.as_object() else {
            return Err(GraphError::InvalidRecord {
                schema: context.to_string(),
            });
        };
        for field in required {
            if !map.contains_key(*field) {
                return Err(GraphError::MissingField {
                    schema: context.to_string(),
                    field: field.to_string(),
                });
            }
        }
        for field in fan_fields {
            match map.get(*field) {
                None | Some(Value::Null) | Some(Value::Array(_)) => {}
                Some(_) => {
                    return Err(GraphError::NotACollection {
                        schema: context.to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Every parameter reference the write statements will read must be present
/// up front, rather than surfacing as an opaque driver error mid-batch.
fn validate_write_params(schema: &NodeSchema, params: &RunParams) -> GraphResult<()> {
    let mut names: Vec<&str> = Vec::new();
    for spec in &schema.properties {
        if let PropertyRef::Param(name) = &spec.reference {
            names.push(name);
        }
    }
    for rel in schema.all_rels() {
        for entry in &rel.matcher {
            if let PropertyRef::Param(name) = &entry.reference {
                names.push(name);
            }
        }
        for (_, reference) in &rel.properties {
            if let PropertyRef::Param(name) = reference {
                names.push(name);
            }
        }
    }
    for name in names {
        if params.get(name).is_none() {
            return Err(GraphError::MissingRunParam {
                name: name.to_string(),
                context: format!("schema '{}' write", schema.label),
            });
        }
    }
    Ok(())
}
