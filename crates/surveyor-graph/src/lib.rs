//! # Surveyor Graph
//!
//! Neo4j write and cleanup engine for declarative inventory schemas.
//!
//! Compiles [`surveyor_model`] schemas into parameterized batched Cypher,
//! executes them with bounded retry, and retires stale data with
//! generational mark-and-sweep cleanup.

pub mod bolt;
pub mod cleanupbuilder;
pub mod client;
pub mod error;
pub mod executor;
pub mod indexes;
pub mod loader;
pub mod querybuilder;
pub mod statement;

#[cfg(test)]
mod testutil;

pub use client::{GraphClient, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use executor::{RetryPolicy, StatementExecutor, StatementRunner};
pub use loader::{GraphLoader, LoaderConfig, RunParams};
pub use statement::GraphStatement;
