//! Property references: how a declared attribute gets its value at load time.
//!
//! Every attribute on a node or relationship schema is backed by a
//! [`PropertyRef`], which resolves to either a field on each record of the
//! batch or a single run-scoped parameter. The write compiler renders the
//! former as `item.<name>` inside its `UNWIND $DictList AS item` statement
//! and the latter as the query parameter `$<name>`.

use serde::Serialize;

use crate::error::SchemaError;

/// A reference to the value backing one schema attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyRef {
    /// Read from the named field of each record in the batch.
    Field(String),
    /// A single value supplied once per run (e.g. the generation tag or a
    /// tenant identifier).
    Param(String),
}

impl PropertyRef {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::Param(name.into())
    }

    /// The field or parameter name this reference reads.
    pub fn name(&self) -> &str {
        match self {
            Self::Field(name) | Self::Param(name) => name,
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    /// Render the reference as it appears in a batched ingestion query.
    pub fn render(&self) -> String {
        match self {
            Self::Field(name) => format!("item.{name}"),
            Self::Param(name) => format!("${name}"),
        }
    }
}

/// How a matcher attribute is compared against the target node's property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MatchMode {
    /// Exact equality (default; most efficient).
    #[default]
    Exact,
    /// Case-insensitive equality, for sources that treat identifiers as
    /// case-insensitive while others store them lowercased.
    IgnoreCase,
    /// Case-insensitive containment (`CONTAINS`).
    Contains,
    /// The record field holds an ordered collection; each element
    /// independently identifies one target node and yields one edge.
    FanOut,
}

/// One entry of a node matcher: the target attribute, the reference that
/// supplies the value to compare, and the comparison mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatcherRef {
    pub key: String,
    pub reference: PropertyRef,
    pub mode: MatchMode,
}

impl MatcherRef {
    pub fn new(key: impl Into<String>, reference: PropertyRef) -> Self {
        Self {
            key: key.into(),
            reference,
            mode: MatchMode::Exact,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Result<Self, SchemaError> {
        // Fan-out reads a collection off the record; a run parameter is a
        // single value and case folding has no meaning element-wise.
        if mode == MatchMode::FanOut && self.reference.is_param() {
            return Err(SchemaError::BadMatcher {
                key: self.key,
                reason: "fan-out must read a collection from a record field, not a run parameter"
                    .into(),
            });
        }
        self.mode = mode;
        Ok(self)
    }
}

/// A declared node property: attribute name, backing reference, and whether
/// the attribute should get its own index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySpec {
    pub name: String,
    pub reference: PropertyRef,
    pub extra_index: bool,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, reference: PropertyRef) -> Self {
        Self {
            name: name.into(),
            reference,
            extra_index: false,
        }
    }

    /// Request an index on this attribute, for properties queried often.
    pub fn indexed(mut self) -> Self {
        self.extra_index = true;
        self
    }
}
