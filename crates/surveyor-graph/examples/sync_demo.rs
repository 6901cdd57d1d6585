//! End-to-end demo against a local Neo4j: define a tenant-scoped schema,
//! write two generations of records, and watch cleanup retire the stale one.
//!
//! Run with `cargo run --example sync_demo` (expects bolt://localhost:7687,
//! credentials via NEO4J_USER / NEO4J_PASSWORD).

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use surveyor_graph::{GraphClient, GraphConfig, GraphLoader, LoaderConfig, RunParams};
use surveyor_model::{MatcherRef, NodeSchema, PropertyRef, RelDirection, RelSchema};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = GraphConfig {
        user: std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".into()),
        password: std::env::var("NEO4J_PASSWORD").unwrap_or_else(|_| "neo4j".into()),
        ..GraphConfig::default()
    };
    let client = GraphClient::connect(&config).await?;
    let loader = GraphLoader::new(Arc::new(client), LoaderConfig::default());

    let account = NodeSchema::builder("DemoAccount").field("id", "id").build()?;
    let widget = NodeSchema::builder("DemoWidget")
        .field("id", "id")
        .field("name", "name")
        .owned_by(
            RelSchema::new("DemoAccount", "RESOURCE", RelDirection::Inward)
                .match_on(MatcherRef::new("id", PropertyRef::param("account_id"))),
        )
        .build()?;

    // First generation: two widgets.
    let run1 = RunParams::now().with("account_id", "acct-demo");
    loader
        .write(&account, &[json!({"id": "acct-demo"})], &run1)
        .await?;
    loader
        .write(
            &widget,
            &[
                json!({"id": "w1", "name": "first widget"}),
                json!({"id": "w2", "name": "second widget"}),
            ],
            &run1,
        )
        .await?;
    loader.cleanup(&widget, &run1).await?;

    // Second generation: w2 disappeared from the inventory.
    let run2 = RunParams::new(run1.update_tag() + 1).with("account_id", "acct-demo");
    loader
        .write(&widget, &[json!({"id": "w1", "name": "first widget"})], &run2)
        .await?;
    loader.cleanup(&widget, &run2).await?;

    println!("done: DemoWidget w2 was swept, w1 survives");
    Ok(())
}
