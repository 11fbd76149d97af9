use affiliator_core::{Author, Document, Organization};

use crate::graph::{AffiliationGraph, Relation};

/// Person name → affiliation node ids, people in graph insertion order.
pub type AffiliationMap = Vec<(String, Vec<String>)>;

/// Flatten a graph into each person's `affiliated_with` targets.
///
/// Every person node appears, including those with no affiliation.
pub fn project(graph: &AffiliationGraph) -> AffiliationMap {
    graph
        .people()
        .map(|person| {
            let affiliations = graph
                .targets(&person.id, Relation::AffiliatedWith)
                .into_iter()
                .map(|node| node.id.clone())
                .collect();
            (person.id.clone(), affiliations)
        })
        .collect()
}

/// One `(person, affiliation)` pair per `affiliated_with` edge.
pub fn affiliation_pairs(graph: &AffiliationGraph) -> Vec<(String, String)> {
    project(graph)
        .into_iter()
        .flat_map(|(person, affiliations)| {
            affiliations
                .into_iter()
                .map(move |affiliation| (person.clone(), affiliation))
        })
        .collect()
}

/// The API document for a graph.
pub fn to_document(graph: &AffiliationGraph) -> Document {
    Document {
        authors: project(graph)
            .into_iter()
            .map(|(name, affiliations)| Author {
                name,
                affiliations: affiliations
                    .into_iter()
                    .map(|name| Organization { name })
                    .collect(),
            })
            .collect(),
    }
}
