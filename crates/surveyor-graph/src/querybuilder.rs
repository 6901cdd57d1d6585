//! Write compiler: schema + batch of records → batched upsert statements.
//!
//! Every statement follows the `UNWIND $DictList AS item` pattern so one
//! parameterized query upserts a whole chunk. The compiler emits an ordered
//! list: the node upsert first, then one edge upsert per declared
//! relationship. Relationship targets are matched, never created; a record
//! whose target does not exist simply contributes no edge row, which is not
//! an error (the target may belong to a connector that runs earlier or
//! later).

use surveyor_model::{
    LinkSchema, MatchMode, MatcherRef, NodeSchema, PropertyRef, RelDirection, RelSchema,
    GENERATION_TAG, ID_PROPERTY, SCOPE_ID, SCOPE_LABEL,
};

/// The alias bound to each fan-out element. One edge row per element.
const FAN_VAR: &str = "fan_value";

/// Build the batched node upsert for a schema.
///
/// `MERGE` keys on the identifying attribute; `firstseen` is stamped only on
/// creation and the generation tag on every pass, which is what makes
/// re-application with the same tag a no-op for counts.
pub fn build_node_statement(schema: &NodeSchema) -> String {
    let mut set_lines = vec![format!("i.{GENERATION_TAG} = ${GENERATION_TAG}")];
    for spec in &schema.properties {
        // MERGE already set id; don't set it again.
        if spec.name == ID_PROPERTY {
            continue;
        }
        set_lines.push(format!("i.{} = {}", spec.name, spec.reference.render()));
    }
    if !schema.extra_labels.is_empty() {
        set_lines.push(format!("i:{}", schema.extra_labels.join(":")));
    }

    format!(
        "UNWIND $DictList AS item\n\
         MERGE (i:{label} {{{ID_PROPERTY}: {id_ref}}})\n\
         ON CREATE SET i.firstseen = timestamp()\n\
         SET {set_clause}",
        label = schema.label,
        id_ref = schema.id_ref().render(),
        set_clause = set_lines.join(",\n    "),
    )
}

/// Build one edge upsert per relationship declared on the schema, owning
/// relationship first.
pub fn build_rel_statements(schema: &NodeSchema) -> Vec<String> {
    let mut statements = Vec::new();
    if let Some(owner) = &schema.owning_rel {
        statements.push(build_owner_rel_statement(schema, owner));
    }
    for rel in &schema.peer_rels {
        statements.push(build_peer_rel_statement(schema, rel));
    }
    statements
}

/// Owning-relationship upsert. The owner matcher is validated to be
/// all-parameter exact matches, so it inlines as a property map.
fn build_owner_rel_statement(schema: &NodeSchema, owner: &RelSchema) -> String {
    let match_clause = owner
        .matcher
        .iter()
        .map(|m| format!("{}: {}", m.key, m.reference.render()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UNWIND $DictList AS item\n\
         MATCH (i:{label} {{{ID_PROPERTY}: {id_ref}}})\n\
         MATCH (j:{target} {{{match_clause}}})\n\
         MERGE {merge}\n\
         ON CREATE SET r.firstseen = timestamp()\n\
         SET {set_clause}",
        label = schema.label,
        id_ref = schema.id_ref().render(),
        target = owner.target_label,
        merge = render_merge("i", "r", "j", &owner.rel_label, owner.direction),
        set_clause = rel_set_clause("r", &owner.properties),
    )
}

/// Peer-relationship upsert. Match modes render into the WHERE clause; a
/// fan-out matcher expands the record's collection so each element keys its
/// own edge upsert (an empty collection unwinds to zero rows).
fn build_peer_rel_statement(schema: &NodeSchema, rel: &RelSchema) -> String {
    let fan_unwind = rel
        .fan_out_entry()
        .map(|m| format!("UNWIND {} AS {FAN_VAR}\n", m.reference.render()))
        .unwrap_or_default();

    format!(
        "UNWIND $DictList AS item\n\
         MATCH (i:{label} {{{ID_PROPERTY}: {id_ref}}})\n\
         {fan_unwind}\
         MATCH (n:{target})\n\
         WHERE {where_clause}\n\
         MERGE {merge}\n\
         ON CREATE SET r.firstseen = timestamp()\n\
         SET {set_clause}",
        label = schema.label,
        id_ref = schema.id_ref().render(),
        target = rel.target_label,
        where_clause = render_where("n", &rel.matcher),
        merge = render_merge("i", "r", "n", &rel.rel_label, rel.direction),
        set_clause = rel_set_clause("r", &rel.properties),
    )
}

/// Build the upsert for a cross-reference link: match both pre-existing
/// endpoints, merge the edge, and stamp the owning scope alongside the
/// generation tag so the link cleanup pass can find it without either
/// endpoint's schema.
pub fn build_link_statement(link: &LinkSchema) -> String {
    let mut set_lines = vec![
        format!("r.{GENERATION_TAG} = ${GENERATION_TAG}"),
        format!("r.{SCOPE_LABEL} = ${SCOPE_LABEL}"),
        format!("r.{SCOPE_ID} = ${SCOPE_ID}"),
    ];
    for (name, reference) in &link.properties {
        set_lines.push(format!("r.{} = {}", name, reference.render()));
    }

    format!(
        "UNWIND $DictList AS item\n\
         MATCH (from:{source})\n\
         WHERE {source_where}\n\
         MATCH (to:{target})\n\
         WHERE {target_where}\n\
         MERGE {merge}\n\
         ON CREATE SET r.firstseen = timestamp()\n\
         SET {set_clause}",
        source = link.source_label,
        source_where = render_where("from", &link.source_matcher),
        target = link.target_label,
        target_where = render_where("to", &link.target_matcher),
        merge = render_merge("from", "r", "to", &link.rel_label, link.direction),
        set_clause = set_lines.join(",\n    "),
    )
}

fn rel_set_clause(rel_var: &str, properties: &[(String, PropertyRef)]) -> String {
    let mut lines = vec![format!("{rel_var}.{GENERATION_TAG} = ${GENERATION_TAG}")];
    for (name, reference) in properties {
        lines.push(format!("{rel_var}.{} = {}", name, reference.render()));
    }
    lines.join(",\n    ")
}

fn render_merge(
    source_var: &str,
    rel_var: &str,
    target_var: &str,
    rel_label: &str,
    direction: RelDirection,
) -> String {
    match direction {
        RelDirection::Inward => format!("({source_var})<-[{rel_var}:{rel_label}]-({target_var})"),
        RelDirection::Outward => format!("({source_var})-[{rel_var}:{rel_label}]->({target_var})"),
    }
}

fn render_where(node_var: &str, matcher: &[MatcherRef]) -> String {
    matcher
        .iter()
        .map(|m| render_match_line(node_var, m))
        .collect::<Vec<_>>()
        .join(" AND\n      ")
}

fn render_match_line(node_var: &str, m: &MatcherRef) -> String {
    let reference = m.reference.render();
    match m.mode {
        MatchMode::Exact => format!("{node_var}.{} = {reference}", m.key),
        MatchMode::IgnoreCase => {
            format!("toLower({node_var}.{}) = toLower({reference})", m.key)
        }
        MatchMode::Contains => {
            format!("toLower({node_var}.{}) CONTAINS toLower({reference})", m.key)
        }
        // Each fan-out element was bound to its own row by the UNWIND above.
        MatchMode::FanOut => format!("{node_var}.{} = {FAN_VAR}", m.key),
    }
}
