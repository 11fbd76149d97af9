//! Graph construction from a normalized entity stream.
//!
//! Two strategies exist. Documents that mark affiliations with footnote keys
//! are parsed by [`keyed`]; everything else by [`non_keyed`], which assumes
//! each author is directly followed by their affiliation.

pub mod keyed;
pub mod non_keyed;

use petgraph::graph::NodeIndex;

use affiliator_core::{AffiliationError, Entity, EntityLabel};

use crate::config::OrgAfterPerson;
use crate::graph::{AffiliationGraph, NodeKind, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NonKeyed,
    Keyed,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NonKeyed => "non-keyed",
            Strategy::Keyed => "keyed",
        }
    }
}

/// Keyed iff the stream holds at least one KEY entity.
pub fn choose_strategy(entities: &[Entity]) -> Strategy {
    if entities.iter().any(|e| e.label == EntityLabel::Key) {
        Strategy::Keyed
    } else {
        Strategy::NonKeyed
    }
}

/// Build a fresh graph from `entities` with the strategy they call for.
pub fn build_graph(
    entities: &[Entity],
    org_after_person: OrgAfterPerson,
) -> Result<AffiliationGraph, AffiliationError> {
    let strategy = choose_strategy(entities);
    let graph = match strategy {
        Strategy::NonKeyed => non_keyed::parse(entities, org_after_person),
        Strategy::Keyed => keyed::parse(entities)?,
    };
    tracing::debug!(
        ?strategy,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built affiliation graph"
    );
    Ok(graph)
}

pub(crate) fn emit_person(graph: &mut AffiliationGraph, person: &Entity) -> NodeIndex {
    graph.ensure_node(&person.text, &person.text, NodeKind::Person)
}

/// Add the node chain for one affiliation and return its full-length node.
///
/// Every suffix of `parts`, shortest first, becomes a node whose id is the
/// suffix texts joined with `", "`. Each node links to the next shorter one:
/// `part_of` when both heads are ORG, `located_in` otherwise.
pub(crate) fn emit_affiliation(graph: &mut AffiliationGraph, parts: &[Entity]) -> Option<NodeIndex> {
    let mut previous: Option<(NodeIndex, EntityLabel)> = None;

    for len in 1..=parts.len() {
        let suffix = &parts[parts.len() - len..];
        let head = &suffix[0];
        let id = suffix
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let idx = graph.ensure_node(&id, &head.text, NodeKind::for_affiliation_head(head.label));

        if let Some((prev_idx, prev_label)) = previous {
            let relation = if head.label == EntityLabel::Org && prev_label == EntityLabel::Org {
                Relation::PartOf
            } else {
                Relation::LocatedIn
            };
            graph.add_relation(idx, prev_idx, relation);
        }
        previous = Some((idx, head.label));
    }

    previous.map(|(idx, _)| idx)
}
