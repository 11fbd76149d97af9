//! Sequential parser for "author, affiliation, author, affiliation" layouts.
//!
//! A small state machine walks the entity stream. Its moves come from
//! [`transition`], a pure function of the current phase, the incoming label
//! and the previous label, so every rule can be read off in one place.

use affiliator_core::{Entity, EntityLabel};

use crate::config::OrgAfterPerson;
use crate::graph::{AffiliationGraph, Relation};
use crate::parser::{emit_affiliation, emit_person};

#[derive(Debug)]
enum State {
    /// No author seen yet.
    Idle,
    /// An author is pending with nothing accumulated.
    AwaitingAffiliation { person: Entity },
    /// An author is pending with at least one affiliation part.
    Accumulating { person: Entity, parts: Vec<Entity> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingAffiliation,
    Accumulating,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::AwaitingAffiliation { .. } => Phase::AwaitingAffiliation,
            State::Accumulating { .. } => Phase::Accumulating,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// Make the entity the pending author, discarding nothing.
    StartPerson,
    /// Emit the pending author and affiliation, then make the entity the pending author.
    EmitAndStartPerson,
    /// Start an affiliation with the entity.
    Begin,
    /// Add the entity to the affiliation being accumulated.
    Append,
    Ignore,
}

/// The transition table.
///
/// An ORG joins an affiliation only after another ORG unless the policy is
/// [`OrgAfterPerson::Append`]. A GPE only extends an affiliation that has
/// already started.
fn transition(
    phase: Phase,
    label: EntityLabel,
    prev: Option<EntityLabel>,
    policy: OrgAfterPerson,
) -> Move {
    use EntityLabel::*;

    let org_chains = prev == Some(Org) || policy == OrgAfterPerson::Append;
    match (phase, label) {
        (Phase::Accumulating, Person) => Move::EmitAndStartPerson,
        (_, Person) => Move::StartPerson,
        (Phase::AwaitingAffiliation, Org) if org_chains => Move::Begin,
        (Phase::Accumulating, Org) if org_chains => Move::Append,
        (Phase::Accumulating, Gpe) => Move::Append,
        _ => Move::Ignore,
    }
}

/// Parse `entities` into a graph, linking each author to the affiliation that
/// follows them.
///
/// A relationship is emitted only when the next author arrives; an
/// affiliation still accumulating at the end of the stream is discarded.
pub fn parse(entities: &[Entity], policy: OrgAfterPerson) -> AffiliationGraph {
    let mut graph = AffiliationGraph::new();
    let mut state = State::Idle;
    let mut prev: Option<EntityLabel> = None;

    for entity in entities {
        let step = transition(state.phase(), entity.label, prev, policy);
        tracing::trace!(label = %entity.label, text = %entity.text, ?step, "non-keyed step");

        state = match (step, state) {
            (Move::StartPerson, _) => State::AwaitingAffiliation {
                person: entity.clone(),
            },
            (Move::EmitAndStartPerson, State::Accumulating { person, parts }) => {
                emit_relationship(&mut graph, &person, &parts);
                State::AwaitingAffiliation {
                    person: entity.clone(),
                }
            }
            (Move::Begin, State::AwaitingAffiliation { person }) => State::Accumulating {
                person,
                parts: vec![entity.clone()],
            },
            (Move::Append, State::Accumulating { person, mut parts }) => {
                parts.push(entity.clone());
                State::Accumulating { person, parts }
            }
            (_, state) => state,
        };
        prev = Some(entity.label);
    }

    graph
}

fn emit_relationship(graph: &mut AffiliationGraph, person: &Entity, parts: &[Entity]) {
    let person_idx = emit_person(graph, person);
    if let Some(affiliation) = emit_affiliation(graph, parts) {
        graph.add_relation(person_idx, affiliation, Relation::AffiliatedWith);
    }
}
