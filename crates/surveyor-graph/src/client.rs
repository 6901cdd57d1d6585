//! Neo4j connection client.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

use crate::bolt::to_query;
use crate::error::{GraphError, GraphResult};
use crate::executor::StatementRunner;
use crate::statement::GraphStatement;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_db")]
    pub db: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_db() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> usize {
    16
}

fn default_fetch_size() -> usize {
    200
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            db: default_db(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Driver-backed statement runner.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// Note: neo4rs uses a lazy pool — `Graph::connect` only creates the pool
    /// object and does NOT establish a real bolt connection yet. We run a
    /// cheap `RETURN 1` ping immediately so that callers can wrap this in a
    /// timeout and get a fast failure when Neo4j is unreachable instead of
    /// hanging silently.
    pub async fn connect(config: &GraphConfig) -> GraphResult<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.db.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(GraphError::from_driver)?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(GraphError::from_driver)?;

        // Ping to force an actual TCP+bolt handshake so a caller's timeout works.
        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(GraphError::from_driver)?;

        Ok(Self { graph })
    }

    /// Create a new GraphClient with default configuration.
    pub async fn connect_default() -> GraphResult<Self> {
        Self::connect(&GraphConfig::default()).await
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

#[async_trait]
impl StatementRunner for GraphClient {
    async fn execute(&self, stmt: &GraphStatement) -> GraphResult<()> {
        self.graph
            .run(to_query(stmt))
            .await
            .map_err(GraphError::from_driver)
    }

    async fn execute_counted(&self, stmt: &GraphStatement) -> GraphResult<i64> {
        let mut result = self
            .graph
            .execute(to_query(stmt))
            .await
            .map_err(GraphError::from_driver)?;

        let row = result
            .next()
            .await
            .map_err(GraphError::from_driver)?
            .ok_or_else(|| GraphError::BadResult {
                context: "counted statement returned no rows".to_string(),
            })?;

        row.get::<i64>("deleted").map_err(|e| GraphError::BadResult {
            context: format!("counted statement has no 'deleted' column: {e:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.db, "neo4j");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_config_deserializes_with_optional_fields() {
        let config: GraphConfig = serde_json::from_str(
            r#"{"uri": "bolt://graph:7687", "user": "svc", "password": "secret"}"#,
        )
        .unwrap();
        assert_eq!(config.uri, "bolt://graph:7687");
        assert_eq!(config.db, "neo4j");
        assert_eq!(config.fetch_size, 200);
    }
}
