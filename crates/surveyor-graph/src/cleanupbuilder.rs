//! Cleanup compiler: schema → generational mark-and-sweep delete statements.
//!
//! Writes stamp every node and edge with the run's generation tag; cleanup
//! deletes whatever still carries an older tag. Deletion is scoped through
//! the owning relationship so one tenant's stale data never touches
//! another's, and every statement deletes in `$LIMIT_SIZE` slices so a large
//! sweep never monopolizes the database.

use surveyor_model::{
    LinkSchema, NodeSchema, RelDirection, RelSchema, GENERATION_TAG, SCOPE_ID, SCOPE_LABEL,
};

use crate::statement::{LIMIT_SIZE, UPDATE_TAG};

/// Build the ordered delete statements for one schema.
///
/// Stale nodes go first: the scoped node match traverses the owning edge,
/// which a prior edge sweep would have severed, and `DETACH DELETE` removes
/// a stale node's edges with it anyway. Edge sweeps then retire stale edges
/// whose endpoints both survived.
pub fn build_cleanup_statements(schema: &NodeSchema) -> Vec<String> {
    match (&schema.owning_rel, schema.scoped_cleanup) {
        (Some(owner), true) => {
            let mut stmts = vec![scoped_node_delete(schema, owner), scoped_owner_edge_delete(schema, owner)];
            for rel in &schema.peer_rels {
                stmts.push(scoped_peer_edge_delete(schema, owner, rel));
            }
            stmts
        }
        // No owner to scope through: peer edges are still generational, but
        // the nodes themselves have no tenant and are left alone.
        (None, true) => schema
            .peer_rels
            .iter()
            .map(|rel| unscoped_peer_edge_delete(schema, rel))
            .collect(),
        (None, false) => {
            let mut stmts = vec![unscoped_node_delete(schema)];
            for rel in &schema.peer_rels {
                stmts.push(unscoped_peer_edge_delete(schema, rel));
            }
            stmts
        }
        // Rejected by NodeSchemaBuilder::build.
        (Some(_), false) => unreachable!("owned schemas are always scoped"),
    }
}

/// Build the delete statement for stale cross-reference links, matched on
/// the scope stamped into each edge at write time.
pub fn build_link_cleanup_statement(link: &LinkSchema) -> String {
    format!(
        "MATCH (:{source}){rel}(:{target})\n\
         WHERE r.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         AND r.{SCOPE_LABEL} = ${SCOPE_LABEL}\n\
         AND r.{SCOPE_ID} = ${SCOPE_ID}\n\
         WITH r LIMIT ${LIMIT_SIZE}\n\
         DELETE r\n\
         RETURN count(*) AS deleted",
        source = link.source_label,
        target = link.target_label,
        rel = render_rel("r", &link.rel_label, link.direction),
    )
}

fn scoped_node_delete(schema: &NodeSchema, owner: &RelSchema) -> String {
    format!(
        "MATCH (n:{label}){rel}(:{owner_label} {{{owner_match}}})\n\
         WHERE n.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         WITH n LIMIT ${LIMIT_SIZE}\n\
         DETACH DELETE n\n\
         RETURN count(*) AS deleted",
        label = schema.label,
        rel = render_rel("", &owner.rel_label, owner.direction),
        owner_label = owner.target_label,
        owner_match = render_owner_match(owner),
    )
}

fn scoped_owner_edge_delete(schema: &NodeSchema, owner: &RelSchema) -> String {
    format!(
        "MATCH (:{label}){rel}(:{owner_label} {{{owner_match}}})\n\
         WHERE r.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         WITH r LIMIT ${LIMIT_SIZE}\n\
         DELETE r\n\
         RETURN count(*) AS deleted",
        label = schema.label,
        rel = render_rel("r", &owner.rel_label, owner.direction),
        owner_label = owner.target_label,
        owner_match = render_owner_match(owner),
    )
}

fn scoped_peer_edge_delete(schema: &NodeSchema, owner: &RelSchema, peer: &RelSchema) -> String {
    format!(
        "MATCH (n:{label}){owner_rel}(:{owner_label} {{{owner_match}}})\n\
         MATCH (n){peer_rel}(:{peer_label})\n\
         WHERE r.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         WITH r LIMIT ${LIMIT_SIZE}\n\
         DELETE r\n\
         RETURN count(*) AS deleted",
        label = schema.label,
        owner_rel = render_rel("", &owner.rel_label, owner.direction),
        owner_label = owner.target_label,
        owner_match = render_owner_match(owner),
        peer_rel = render_rel("r", &peer.rel_label, peer.direction),
        peer_label = peer.target_label,
    )
}

fn unscoped_node_delete(schema: &NodeSchema) -> String {
    format!(
        "MATCH (n:{label})\n\
         WHERE n.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         WITH n LIMIT ${LIMIT_SIZE}\n\
         DETACH DELETE n\n\
         RETURN count(*) AS deleted",
        label = schema.label,
    )
}

fn unscoped_peer_edge_delete(schema: &NodeSchema, peer: &RelSchema) -> String {
    format!(
        "MATCH (:{label}){peer_rel}(:{peer_label})\n\
         WHERE r.{GENERATION_TAG} <> ${UPDATE_TAG}\n\
         WITH r LIMIT ${LIMIT_SIZE}\n\
         DELETE r\n\
         RETURN count(*) AS deleted",
        label = schema.label,
        peer_rel = render_rel("r", &peer.rel_label, peer.direction),
        peer_label = peer.target_label,
    )
}

/// Owner matchers are validated as all-parameter exact, so they inline as a
/// property map using the same parameter names the write pass used.
fn render_owner_match(owner: &RelSchema) -> String {
    owner
        .matcher
        .iter()
        .map(|m| format!("{}: {}", m.key, m.reference.render()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_rel(rel_var: &str, rel_label: &str, direction: RelDirection) -> String {
    match direction {
        RelDirection::Inward => format!("<-[{rel_var}:{rel_label}]-"),
        RelDirection::Outward => format!("-[{rel_var}:{rel_label}]->"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surveyor_model::{MatcherRef, PropertyRef};

    fn owned_schema() -> NodeSchema {
        NodeSchema::builder("Widget")
            .field("id", "id")
            .owned_by(
                RelSchema::new("Account", "RESOURCE", RelDirection::Inward)
                    .match_on(MatcherRef::new("id", PropertyRef::param("account_id"))),
            )
            .peer(
                RelSchema::new("Role", "ASSUMES", RelDirection::Outward)
                    .match_on(MatcherRef::new("arn", PropertyRef::field("role_arn"))),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_scoped_cleanup_deletes_nodes_then_edges() {
        let stmts = build_cleanup_statements(&owned_schema());
        assert_eq!(stmts.len(), 3);

        assert!(stmts[0].contains("MATCH (n:Widget)<-[:RESOURCE]-(:Account {id: $account_id})"));
        assert!(stmts[0].contains("WHERE n.lastupdated <> $UPDATE_TAG"));
        assert!(stmts[0].contains("DETACH DELETE n"));

        assert!(stmts[1].contains("<-[r:RESOURCE]-"));
        assert!(stmts[1].contains("WHERE r.lastupdated <> $UPDATE_TAG"));
        assert!(!stmts[1].contains("DETACH"));

        assert!(stmts[2].contains("MATCH (n)-[r:ASSUMES]->(:Role)"));
        // Peer edge sweep stays scoped through the owning edge.
        assert!(stmts[2].contains("(:Account {id: $account_id})"));
    }

    #[test]
    fn test_every_statement_is_limited_and_counted() {
        for stmt in build_cleanup_statements(&owned_schema()) {
            assert!(stmt.contains("LIMIT $LIMIT_SIZE"));
            assert!(stmt.ends_with("RETURN count(*) AS deleted"));
        }
    }

    #[test]
    fn test_unowned_scoped_schema_never_deletes_nodes() {
        let schema = NodeSchema::builder("SharedThing")
            .field("id", "id")
            .peer(
                RelSchema::new("Widget", "REFERS_TO", RelDirection::Outward)
                    .match_on(MatcherRef::new("id", PropertyRef::field("widget_id"))),
            )
            .build()
            .unwrap();

        let stmts = build_cleanup_statements(&schema);
        assert_eq!(stmts.len(), 1);
        assert!(!stmts[0].contains("DETACH DELETE"));
        assert!(stmts[0].contains("DELETE r"));
    }

    #[test]
    fn test_unscoped_schema_deletes_globally() {
        let schema = NodeSchema::builder("Cve")
            .field("id", "cve_id")
            .unscoped_cleanup()
            .build()
            .unwrap();

        let stmts = build_cleanup_statements(&schema);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].starts_with("MATCH (n:Cve)"));
        assert!(!stmts[0].contains("Account"));
        assert!(stmts[0].contains("DETACH DELETE n"));
    }

    #[test]
    fn test_link_cleanup_matches_stored_scope() {
        let link = LinkSchema::builder("Employee", "GitHubUser", "IDENTITY_OF", RelDirection::Outward)
            .match_source(MatcherRef::new("email", PropertyRef::field("email")))
            .match_target(MatcherRef::new("username", PropertyRef::field("github_login")))
            .build()
            .unwrap();

        let stmt = build_link_cleanup_statement(&link);
        assert!(stmt.contains("MATCH (:Employee)-[r:IDENTITY_OF]->(:GitHubUser)"));
        assert!(stmt.contains("r._scope_label = $_scope_label"));
        assert!(stmt.contains("r._scope_id = $_scope_id"));
        assert!(stmt.contains("WITH r LIMIT $LIMIT_SIZE"));
    }
}
