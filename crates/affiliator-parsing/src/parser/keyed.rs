//! Parser for layouts where footnote keys link authors to affiliations.
//!
//! The stream is split in two at one entity before the first ORG. Before the
//! split, keys are collected per author; after it, each key introduces the
//! affiliation it stands for.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use affiliator_core::{AffiliationError, Entity, EntityLabel};

use crate::graph::{AffiliationGraph, Relation};
use crate::parser::{emit_affiliation, emit_person};

/// People recorded per key text, keys in first-seen order.
#[derive(Debug, Default)]
struct KeyedPeople(Vec<(String, Vec<NodeIndex>)>);

impl KeyedPeople {
    fn record(&mut self, key: &str, person: NodeIndex) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, people)) => {
                if !people.contains(&person) {
                    people.push(person);
                }
            }
            None => self.0.push((key.to_string(), vec![person])),
        }
    }
}

/// Index splitting the author zone from the affiliation zone.
fn zone_boundary(entities: &[Entity]) -> Result<usize, AffiliationError> {
    let first_org = entities
        .iter()
        .position(|e| e.label == EntityLabel::Org)
        .ok_or(AffiliationError::NoOrganizationEntity)?;
    Ok(first_org.saturating_sub(1))
}

/// Accumulates the affiliation introduced by the current key.
#[derive(Debug, Default)]
struct Pending<'a> {
    key: Option<&'a str>,
    parts: Vec<Entity>,
}

impl<'a> Pending<'a> {
    /// Emit the pending affiliation, bind it to its key and start over with `key`.
    fn flush(
        &mut self,
        graph: &mut AffiliationGraph,
        resolved: &mut HashMap<&'a str, NodeIndex>,
        key: Option<&'a str>,
    ) {
        if let Some(current) = self.key {
            if let Some(node) = emit_affiliation(graph, &self.parts) {
                resolved.insert(current, node);
            }
        }
        self.key = key;
        self.parts.clear();
    }
}

/// Parse `entities` into a graph, resolving authors to affiliations via keys.
///
/// Fails with [`AffiliationError::NoOrganizationEntity`] when the stream has
/// no ORG at all. A key that introduces more than one affiliation resolves to
/// the last one.
pub fn parse(entities: &[Entity]) -> Result<AffiliationGraph, AffiliationError> {
    let boundary = zone_boundary(entities)?;
    let mut graph = AffiliationGraph::new();

    let mut people = KeyedPeople::default();
    let mut current_person: Option<NodeIndex> = None;
    for entity in &entities[..boundary] {
        match entity.label {
            EntityLabel::Person => current_person = Some(emit_person(&mut graph, entity)),
            EntityLabel::Key => {
                if let Some(person) = current_person {
                    people.record(&entity.text, person);
                }
            }
            _ => {}
        }
    }

    let mut resolved: HashMap<&str, NodeIndex> = HashMap::new();
    let mut pending = Pending::default();
    for i in boundary..entities.len() {
        let entity = &entities[i];
        let prev = i.checked_sub(1).map(|p| entities[p].label);
        tracing::trace!(label = %entity.label, text = %entity.text, ?prev, "keyed step");

        match entity.label {
            EntityLabel::Person => pending.flush(&mut graph, &mut resolved, None),
            EntityLabel::Key => {
                pending.flush(&mut graph, &mut resolved, Some(entity.text.as_str()))
            }
            EntityLabel::Org => {
                if pending.key.is_some()
                    && matches!(prev, Some(EntityLabel::Key | EntityLabel::Org))
                {
                    pending.parts.push(entity.clone());
                }
            }
            EntityLabel::Gpe => {
                if pending.key.is_some()
                    && matches!(prev, Some(EntityLabel::Org | EntityLabel::Gpe))
                {
                    pending.parts.push(entity.clone());
                }
            }
        }
    }
    pending.flush(&mut graph, &mut resolved, None);

    for (key, members) in &people.0 {
        let Some(&affiliation) = resolved.get(key.as_str()) else {
            tracing::trace!(%key, "key has no affiliation");
            continue;
        };
        for &person in members {
            graph.add_relation(person, affiliation, Relation::AffiliatedWith);
        }
    }

    Ok(graph)
}
