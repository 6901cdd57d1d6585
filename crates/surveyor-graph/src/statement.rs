//! A single parameterized statement bound for the graph.
//!
//! Compiled query text plus its parameters, carried as JSON until the
//! client converts them to Bolt values at execution time. Statements never
//! interpolate values into the query string; batch data travels through the
//! `$DictList` array parameter and run-scoped values through named
//! parameters.

use serde_json::{Map, Value};

/// Parameter holding the batch of records for `UNWIND $DictList AS item`.
pub const DICT_LIST: &str = "DictList";
/// Parameter holding the current run's generation tag in cleanup queries.
pub const UPDATE_TAG: &str = "UPDATE_TAG";
/// Parameter bounding how many entities one delete transaction touches.
pub const LIMIT_SIZE: &str = "LIMIT_SIZE";

/// A statement that will run against the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStatement {
    pub query: String,
    pub parameters: Map<String, Value>,
    /// Iterative statements delete in `$LIMIT_SIZE` slices and re-run until
    /// a pass deletes nothing.
    pub iterative: bool,
}

impl GraphStatement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Map::new(),
            iterative: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Merge the given parameters in; colliding names take the new value.
    pub fn merge_parameters(mut self, parameters: &Map<String, Value>) -> Self {
        for (k, v) in parameters {
            self.parameters.insert(k.clone(), v.clone());
        }
        self
    }

    /// Mark the statement iterative with the given per-pass delete limit.
    pub fn iterative(mut self, limit: usize) -> Self {
        self.iterative = true;
        self.parameters
            .insert(LIMIT_SIZE.to_string(), Value::from(limit as i64));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_and_merge() {
        let mut extra = Map::new();
        extra.insert("account_id".into(), json!("acct1"));
        extra.insert("lastupdated".into(), json!(200));

        let stmt = GraphStatement::new("RETURN 1")
            .param("lastupdated", 100)
            .merge_parameters(&extra);

        assert_eq!(stmt.parameters["account_id"], json!("acct1"));
        // Merge wins on collision.
        assert_eq!(stmt.parameters["lastupdated"], json!(200));
    }

    #[test]
    fn test_iterative_sets_limit_parameter() {
        let stmt = GraphStatement::new("MATCH (n) DETACH DELETE n").iterative(500);
        assert!(stmt.iterative);
        assert_eq!(stmt.parameters[LIMIT_SIZE], json!(500));
    }
}
