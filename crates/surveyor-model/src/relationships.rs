//! Relationship declarations.
//!
//! A [`RelSchema`] hangs off a node schema and describes one edge from the
//! batch's primary entity to an already-existing target node: the target is
//! found via its matcher, never created. A [`LinkSchema`] is the standalone
//! variant: it connects two independently matched, pre-existing nodes where
//! neither side is the batch's primary entity, and therefore carries its own
//! cleanup scope on every edge it writes.

use serde::Serialize;

use crate::common::{MatchMode, MatcherRef, PropertyRef};
use crate::error::SchemaError;

/// Reserved edge property: the generation tag stamped on every write.
pub const GENERATION_TAG: &str = "lastupdated";
/// Reserved property set only when a node or edge is first created.
pub const FIRST_SEEN: &str = "firstseen";
/// Stored owning-scope label on cross-reference link edges.
pub const SCOPE_LABEL: &str = "_scope_label";
/// Stored owning-scope identifier on cross-reference link edges.
pub const SCOPE_ID: &str = "_scope_id";

/// Which way the edge arrow points relative to the schema's own node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelDirection {
    /// The edge points at this entity: `(entity)<-[r]-(other)`.
    Inward,
    /// The edge points away from this entity: `(entity)-[r]->(other)`.
    Outward,
}

/// An edge from the batch's primary entity to an existing target node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelSchema {
    /// Label of the node on the far side of the edge.
    pub target_label: String,
    /// How to find the target. All entries must hold for a match (AND).
    pub matcher: Vec<MatcherRef>,
    pub direction: RelDirection,
    /// Edge label, e.g. `RESOURCE` or `MEMBER_OF`.
    pub rel_label: String,
    /// Extra edge properties beyond the generation tag, which is always set.
    pub properties: Vec<(String, PropertyRef)>,
}

impl RelSchema {
    pub fn new(
        target_label: impl Into<String>,
        rel_label: impl Into<String>,
        direction: RelDirection,
    ) -> Self {
        Self {
            target_label: target_label.into(),
            matcher: Vec::new(),
            direction,
            rel_label: rel_label.into(),
            properties: Vec::new(),
        }
    }

    /// Add one matcher entry. Multi-attribute matchers AND their entries.
    pub fn match_on(mut self, entry: MatcherRef) -> Self {
        self.matcher.push(entry);
        self
    }

    /// Add an edge property.
    pub fn property(mut self, name: impl Into<String>, reference: PropertyRef) -> Self {
        self.properties.push((name.into(), reference));
        self
    }

    /// The matcher entry carrying fan-out semantics, if any.
    pub fn fan_out_entry(&self) -> Option<&MatcherRef> {
        self.matcher.iter().find(|m| m.mode == MatchMode::FanOut)
    }

    pub(crate) fn validate(&self, owner_label: &str) -> Result<(), SchemaError> {
        if self.matcher.is_empty() {
            return Err(SchemaError::EmptyMatcher {
                rel_label: self.rel_label.clone(),
                target_label: self.target_label.clone(),
            });
        }
        for (name, _) in &self.properties {
            if name == GENERATION_TAG || name == FIRST_SEEN {
                return Err(SchemaError::ReservedProperty {
                    label: owner_label.to_string(),
                    name: name.clone(),
                });
            }
        }
        // One collection per record can fan out; two would cross-product.
        let fan_outs = self
            .matcher
            .iter()
            .filter(|m| m.mode == MatchMode::FanOut)
            .count();
        if fan_outs > 1 {
            return Err(SchemaError::BadMatcher {
                key: self.matcher[0].key.clone(),
                reason: format!(
                    "relationship '{}' declares {fan_outs} fan-out matcher entries; at most one is allowed",
                    self.rel_label
                ),
            });
        }
        Ok(())
    }

    /// Extra checks for use as an owning relationship: the tenant is matched
    /// through run parameters with exact equality, so that cleanup can scope
    /// deletion with the same values.
    pub(crate) fn validate_as_owner(&self, owner_label: &str) -> Result<(), SchemaError> {
        self.validate(owner_label)?;
        for entry in &self.matcher {
            if !entry.reference.is_param() {
                return Err(SchemaError::OwnerMatcherNotParam {
                    label: owner_label.to_string(),
                    rel_label: self.rel_label.clone(),
                    key: entry.key.clone(),
                });
            }
            if entry.mode != MatchMode::Exact {
                return Err(SchemaError::OwnerMatcherNotExact {
                    label: owner_label.to_string(),
                    rel_label: self.rel_label.clone(),
                    key: entry.key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A cross-reference link between two pre-existing entities.
///
/// Because neither endpoint's own cleanup pass would discover these edges,
/// every written link stores its owning scope (`_scope_label`, `_scope_id`)
/// so a dedicated cleanup pass can retire stale links by scope alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSchema {
    pub source_label: String,
    pub source_matcher: Vec<MatcherRef>,
    pub target_label: String,
    pub target_matcher: Vec<MatcherRef>,
    pub direction: RelDirection,
    pub rel_label: String,
    pub properties: Vec<(String, PropertyRef)>,
}

impl LinkSchema {
    pub fn builder(
        source_label: impl Into<String>,
        target_label: impl Into<String>,
        rel_label: impl Into<String>,
        direction: RelDirection,
    ) -> LinkSchemaBuilder {
        LinkSchemaBuilder {
            link: LinkSchema {
                source_label: source_label.into(),
                source_matcher: Vec::new(),
                target_label: target_label.into(),
                target_matcher: Vec::new(),
                direction,
                rel_label: rel_label.into(),
                properties: Vec::new(),
            },
        }
    }
}

/// Builder for [`LinkSchema`]; `build()` performs validation.
#[derive(Debug, Clone)]
pub struct LinkSchemaBuilder {
    link: LinkSchema,
}

impl LinkSchemaBuilder {
    pub fn match_source(mut self, entry: MatcherRef) -> Self {
        self.link.source_matcher.push(entry);
        self
    }

    pub fn match_target(mut self, entry: MatcherRef) -> Self {
        self.link.target_matcher.push(entry);
        self
    }

    pub fn property(mut self, name: impl Into<String>, reference: PropertyRef) -> Self {
        self.link.properties.push((name.into(), reference));
        self
    }

    pub fn build(self) -> Result<LinkSchema, SchemaError> {
        let link = self.link;
        if link.source_matcher.is_empty() {
            return Err(SchemaError::LinkMissingMatcher {
                rel_label: link.rel_label,
                side: "source".into(),
            });
        }
        if link.target_matcher.is_empty() {
            return Err(SchemaError::LinkMissingMatcher {
                rel_label: link.rel_label,
                side: "target".into(),
            });
        }
        // Link matchers identify single existing nodes on both sides;
        // fan-out has no meaning here.
        for entry in link.source_matcher.iter().chain(&link.target_matcher) {
            if entry.mode == MatchMode::FanOut {
                return Err(SchemaError::BadMatcher {
                    key: entry.key.clone(),
                    reason: format!(
                        "fan-out is not supported on cross-reference link '{}'",
                        link.rel_label
                    ),
                });
            }
        }
        for (name, _) in &link.properties {
            if name == GENERATION_TAG
                || name == FIRST_SEEN
                || name == SCOPE_LABEL
                || name == SCOPE_ID
            {
                return Err(SchemaError::ReservedProperty {
                    label: link.rel_label.clone(),
                    name: name.clone(),
                });
            }
        }
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_link() -> LinkSchemaBuilder {
        LinkSchema::builder("Employee", "GitHubUser", "IDENTITY_OF", RelDirection::Outward)
            .match_source(MatcherRef::new("email", PropertyRef::field("email")))
            .match_target(MatcherRef::new("username", PropertyRef::field("github_login")))
    }

    #[test]
    fn test_link_builder_accepts_both_matchers() {
        let link = role_link().build().unwrap();
        assert_eq!(link.source_label, "Employee");
        assert_eq!(link.target_matcher.len(), 1);
    }

    #[test]
    fn test_link_without_source_matcher_rejected() {
        let err = LinkSchema::builder("A", "B", "REL", RelDirection::Outward)
            .match_target(MatcherRef::new("id", PropertyRef::field("b_id")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::LinkMissingMatcher { .. }));
    }

    #[test]
    fn test_link_rejects_reserved_scope_property() {
        let err = role_link()
            .property(SCOPE_ID, PropertyRef::param("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedProperty { .. }));
    }

    #[test]
    fn test_owner_matcher_must_be_param() {
        let rel = RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
            .match_on(MatcherRef::new("id", PropertyRef::field("account_id")));
        let err = rel.validate_as_owner("Widget").unwrap_err();
        assert!(matches!(err, SchemaError::OwnerMatcherNotParam { .. }));
    }

    #[test]
    fn test_owner_matcher_param_exact_ok() {
        let rel = RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
            .match_on(MatcherRef::new("id", PropertyRef::param("account_id")));
        assert!(rel.validate_as_owner("Widget").is_ok());
    }

    #[test]
    fn test_rel_with_empty_matcher_rejected() {
        let rel = RelSchema::new("Account", "RESOURCE", RelDirection::Inward);
        assert!(matches!(
            rel.validate("Widget").unwrap_err(),
            SchemaError::EmptyMatcher { .. }
        ));
    }
}
