//! Node schema: the declarative description of one entity type.
//!
//! A [`NodeSchema`] is built once at startup, validated in `build()`, and
//! reused for every run. The graph data it describes is only ever created by
//! the write compiler and destroyed by the cleanup compiler.

use serde::Serialize;

use crate::common::{PropertyRef, PropertySpec};
use crate::error::SchemaError;
use crate::relationships::{RelSchema, FIRST_SEEN, GENERATION_TAG, SCOPE_ID, SCOPE_LABEL};

/// The identifying attribute present on every node schema.
pub const ID_PROPERTY: &str = "id";

/// One entity type: primary label, properties, relationships, cleanup scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSchema {
    /// Primary label, e.g. `GcpInstance`.
    pub label: String,
    /// Ordered attribute declarations. Always contains `id`.
    pub properties: Vec<PropertySpec>,
    /// Additional labels for cross-source semantic tagging.
    pub extra_labels: Vec<String>,
    /// The edge scoping this entity to its tenant/root, if any. The one
    /// schema per connected schema graph without an owner is the tenant
    /// anchor itself.
    pub owning_rel: Option<RelSchema>,
    /// Other declared edges; not used for cleanup scoping.
    pub peer_rels: Vec<RelSchema>,
    /// Whether cleanup is scoped to the owning relationship (default) or
    /// global. Global is only for data intentionally shared across tenants,
    /// e.g. public vulnerability records.
    pub scoped_cleanup: bool,
}

impl NodeSchema {
    pub fn builder(label: impl Into<String>) -> NodeSchemaBuilder {
        NodeSchemaBuilder {
            schema: NodeSchema {
                label: label.into(),
                properties: Vec::new(),
                extra_labels: Vec::new(),
                owning_rel: None,
                peer_rels: Vec::new(),
                scoped_cleanup: true,
            },
        }
    }

    /// The reference backing the `id` attribute.
    pub fn id_ref(&self) -> &PropertyRef {
        // Guaranteed by build().
        &self
            .properties
            .iter()
            .find(|p| p.name == ID_PROPERTY)
            .expect("validated schema always has an id property")
            .reference
    }

    /// All relationships declared on this schema, owning first.
    pub fn all_rels(&self) -> impl Iterator<Item = &RelSchema> {
        self.owning_rel.iter().chain(self.peer_rels.iter())
    }
}

/// Builder for [`NodeSchema`]; `build()` runs every construction-time check
/// so a misconfigured schema fails before any database connection is opened.
#[derive(Debug, Clone)]
pub struct NodeSchemaBuilder {
    schema: NodeSchema,
}

impl NodeSchemaBuilder {
    /// Declare a record-backed attribute.
    pub fn field(self, name: impl Into<String>, record_field: impl Into<String>) -> Self {
        self.property(PropertySpec::new(name, PropertyRef::field(record_field)))
    }

    /// Declare an attribute backed by a run-scoped parameter.
    pub fn param(self, name: impl Into<String>, param_name: impl Into<String>) -> Self {
        self.property(PropertySpec::new(name, PropertyRef::param(param_name)))
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.schema.properties.push(spec);
        self
    }

    pub fn extra_label(mut self, label: impl Into<String>) -> Self {
        self.schema.extra_labels.push(label.into());
        self
    }

    /// Declare the owning relationship. At most one; a second call replaces
    /// the first.
    pub fn owned_by(mut self, rel: RelSchema) -> Self {
        self.schema.owning_rel = Some(rel);
        self
    }

    pub fn peer(mut self, rel: RelSchema) -> Self {
        self.schema.peer_rels.push(rel);
        self
    }

    /// Opt out of tenant-scoped cleanup. Only valid for schemas without an
    /// owning relationship.
    pub fn unscoped_cleanup(mut self) -> Self {
        self.schema.scoped_cleanup = false;
        self
    }

    pub fn build(self) -> Result<NodeSchema, SchemaError> {
        let schema = self.schema;

        let mut seen = std::collections::HashSet::new();
        for spec in &schema.properties {
            if matches!(
                spec.name.as_str(),
                GENERATION_TAG | FIRST_SEEN | SCOPE_LABEL | SCOPE_ID
            ) {
                return Err(SchemaError::ReservedProperty {
                    label: schema.label.clone(),
                    name: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    label: schema.label.clone(),
                    name: spec.name.clone(),
                });
            }
        }
        if !seen.contains(ID_PROPERTY) {
            return Err(SchemaError::MissingId {
                label: schema.label.clone(),
            });
        }

        if let Some(owner) = &schema.owning_rel {
            owner.validate_as_owner(&schema.label)?;
            if !schema.scoped_cleanup {
                return Err(SchemaError::OwnedButUnscoped {
                    label: schema.label.clone(),
                });
            }
        }
        for rel in &schema.peer_rels {
            rel.validate(&schema.label)?;
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MatchMode, MatcherRef};
    use crate::relationships::RelDirection;

    fn account_owner() -> RelSchema {
        RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
            .match_on(MatcherRef::new("id", PropertyRef::param("account_id")))
    }

    #[test]
    fn test_minimal_schema_builds() {
        let schema = NodeSchema::builder("Widget")
            .field("id", "id")
            .field("name", "name")
            .owned_by(account_owner())
            .build()
            .unwrap();
        assert_eq!(schema.label, "Widget");
        assert_eq!(schema.id_ref(), &PropertyRef::field("id"));
        assert!(schema.scoped_cleanup);
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = NodeSchema::builder("Widget")
            .field("name", "name")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingId { .. }));
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let err = NodeSchema::builder("Widget")
            .field("id", "id")
            .field("name", "name")
            .field("name", "other")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateProperty { .. }));
    }

    #[test]
    fn test_reserved_generation_tag_rejected() {
        let err = NodeSchema::builder("Widget")
            .field("id", "id")
            .field("lastupdated", "ts")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedProperty { .. }));
    }

    #[test]
    fn test_owned_schema_cannot_opt_out_of_scoped_cleanup() {
        let err = NodeSchema::builder("Widget")
            .field("id", "id")
            .owned_by(account_owner())
            .unscoped_cleanup()
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::OwnedButUnscoped { .. }));
    }

    #[test]
    fn test_unowned_unscoped_schema_is_valid() {
        // Shared-across-tenants data, e.g. public vulnerability records.
        let schema = NodeSchema::builder("Cve")
            .field("id", "cve_id")
            .unscoped_cleanup()
            .build()
            .unwrap();
        assert!(!schema.scoped_cleanup);
        assert!(schema.owning_rel.is_none());
    }

    #[test]
    fn test_peer_with_fan_out_accepted() {
        let fan = RelSchema::new("Role", "ASSUMES", RelDirection::Outward).match_on(
            MatcherRef::new("arn", PropertyRef::field("role_arns"))
                .with_mode(MatchMode::FanOut)
                .unwrap(),
        );
        let schema = NodeSchema::builder("InstanceProfile")
            .field("id", "arn")
            .owned_by(account_owner())
            .peer(fan)
            .build()
            .unwrap();
        assert!(schema.peer_rels[0].fan_out_entry().is_some());
    }
}
