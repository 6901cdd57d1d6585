//! Index manager: schema → `CREATE INDEX IF NOT EXISTS` statements.
//!
//! Every label gets indexes on its identifying attribute and the generation
//! tag, since every write MERGEs on the former and every cleanup filters on
//! the latter. Relationship matcher keys on target labels are indexed too,
//! because edge upserts look targets up by them in bulk.

use std::collections::HashSet;

use surveyor_model::{LinkSchema, NodeSchema, GENERATION_TAG, ID_PROPERTY, SCOPE_ID, SCOPE_LABEL};

/// Build the index statements for one schema. Idempotent by construction.
pub fn build_index_statements(schema: &NodeSchema) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut statements = Vec::new();
    let mut add = |label: &str, property: &str| {
        if seen.insert((label.to_string(), property.to_string())) {
            statements.push(node_index(label, property));
        }
    };

    add(&schema.label, ID_PROPERTY);
    add(&schema.label, GENERATION_TAG);
    for label in &schema.extra_labels {
        add(label, ID_PROPERTY);
        add(label, GENERATION_TAG);
    }
    for spec in &schema.properties {
        if spec.extra_index {
            add(&schema.label, &spec.name);
        }
    }
    // Edge upserts bulk-MATCH targets by their matcher keys.
    for rel in schema.all_rels() {
        for entry in &rel.matcher {
            add(&rel.target_label, &entry.key);
        }
    }

    statements
}

/// Build the composite edge index backing cross-reference link cleanup,
/// which matches purely on the generation tag and stored scope.
pub fn build_link_index_statements(link: &LinkSchema) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut statements = vec![format!(
        "CREATE INDEX IF NOT EXISTS FOR ()-[r:{}]-() ON (r.{GENERATION_TAG}, r.{SCOPE_LABEL}, r.{SCOPE_ID})",
        link.rel_label
    )];

    for (label, matcher) in [
        (&link.source_label, &link.source_matcher),
        (&link.target_label, &link.target_matcher),
    ] {
        for entry in matcher {
            if seen.insert((label.clone(), entry.key.clone())) {
                statements.push(node_index(label, &entry.key));
            }
        }
    }

    statements
}

fn node_index(label: &str, property: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS FOR (n:{label}) ON (n.{property})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use surveyor_model::{MatcherRef, PropertyRef, PropertySpec, RelDirection, RelSchema};

    #[test]
    fn test_schema_indexes_cover_id_tag_and_matchers() {
        let schema = NodeSchema::builder("Widget")
            .field("id", "id")
            .property(PropertySpec::new("name", PropertyRef::field("name")).indexed())
            .extra_label("Asset")
            .owned_by(
                RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
                    .match_on(MatcherRef::new("id", PropertyRef::param("account_id"))),
            )
            .build()
            .unwrap();

        let stmts = build_index_statements(&schema);
        let expect = [
            "CREATE INDEX IF NOT EXISTS FOR (n:Widget) ON (n.id)",
            "CREATE INDEX IF NOT EXISTS FOR (n:Widget) ON (n.lastupdated)",
            "CREATE INDEX IF NOT EXISTS FOR (n:Asset) ON (n.id)",
            "CREATE INDEX IF NOT EXISTS FOR (n:Asset) ON (n.lastupdated)",
            "CREATE INDEX IF NOT EXISTS FOR (n:Widget) ON (n.name)",
            "CREATE INDEX IF NOT EXISTS FOR (n:Account) ON (n.id)",
        ];
        assert_eq!(stmts, expect);
    }

    #[test]
    fn test_duplicate_label_property_pairs_emitted_once() {
        let schema = NodeSchema::builder("Widget")
            .field("id", "id")
            .owned_by(
                RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
                    .match_on(MatcherRef::new("id", PropertyRef::param("account_id"))),
            )
            .peer(
                RelSchema::new("Account", "AUDITED_BY", RelDirection::Outward)
                    .match_on(MatcherRef::new("id", PropertyRef::field("auditor_id"))),
            )
            .build()
            .unwrap();

        let stmts = build_index_statements(&schema);
        let account_id = stmts
            .iter()
            .filter(|s| s.contains("(n:Account) ON (n.id)"))
            .count();
        assert_eq!(account_id, 1);
    }

    #[test]
    fn test_link_index_is_composite_over_tag_and_scope() {
        let link = LinkSchema::builder("Employee", "GitHubUser", "IDENTITY_OF", RelDirection::Outward)
            .match_source(MatcherRef::new("email", PropertyRef::field("email")))
            .match_target(MatcherRef::new("username", PropertyRef::field("github_login")))
            .build()
            .unwrap();

        let stmts = build_link_index_statements(&link);
        assert_eq!(
            stmts[0],
            "CREATE INDEX IF NOT EXISTS FOR ()-[r:IDENTITY_OF]-() ON (r.lastupdated, r._scope_label, r._scope_id)"
        );
        assert!(stmts.contains(&node_index("Employee", "email")));
        assert!(stmts.contains(&node_index("GitHubUser", "username")));
    }
}
