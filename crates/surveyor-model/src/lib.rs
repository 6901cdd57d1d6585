//! # Surveyor Model
//!
//! Declarative schema model for the Surveyor graph engine.
//!
//! Connectors describe each entity type as a [`NodeSchema`] (label,
//! properties, relationships, cleanup scope) built once at startup; the
//! engine compiles these descriptions into batched Neo4j statements. All
//! validation happens at construction time, before any database connection.

pub mod common;
pub mod error;
pub mod nodes;
pub mod relationships;

pub use common::{MatchMode, MatcherRef, PropertyRef, PropertySpec};
pub use error::SchemaError;
pub use nodes::{NodeSchema, NodeSchemaBuilder, ID_PROPERTY};
pub use relationships::{
    LinkSchema, LinkSchemaBuilder, RelDirection, RelSchema, FIRST_SEEN, GENERATION_TAG, SCOPE_ID,
    SCOPE_LABEL,
};
