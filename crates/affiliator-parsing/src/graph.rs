//! Directed author–affiliation graph backed by petgraph.
//!
//! Nodes are addressed by their text id; inserting an id that already exists
//! returns the existing node, so chains sharing a suffix collapse onto shared
//! nodes. At most one edge exists per (source, target) pair.

use std::collections::HashMap;
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use affiliator_core::EntityLabel;

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Person,
    Organization,
    Location,
}

impl NodeKind {
    /// Node kind for an affiliation chain headed by an entity of `label`.
    ///
    /// Only ORG heads are organizations; everything else in a chain is a place.
    pub fn for_affiliation_head(label: EntityLabel) -> Self {
        match label {
            EntityLabel::Org => NodeKind::Organization,
            _ => NodeKind::Location,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Person => "person",
            NodeKind::Organization => "organization",
            NodeKind::Location => "location",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge type between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// person → affiliation
    AffiliatedWith,
    /// organization → enclosing organization
    PartOf,
    /// organization or place → enclosing place
    LocatedIn,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::AffiliatedWith => "affiliated_with",
            Relation::PartOf => "part_of",
            Relation::LocatedIn => "located_in",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Unique text id (a person's name or a comma-joined affiliation chain).
    pub id: String,
    /// Display label: the name, or the head span of an affiliation chain.
    pub label: String,
    pub kind: NodeKind,
}

/// An edge listed by the ids of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub relation: Relation,
    pub target: String,
}

/// Serializable snapshot of a graph, nodes and edges in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeView>,
}

#[derive(Debug, Clone, Default)]
pub struct AffiliationGraph {
    graph: DiGraph<Node, Relation>,
    index: HashMap<String, NodeIndex>,
}

impl AffiliationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node with `id`.
    ///
    /// An existing node keeps its original label and kind.
    pub fn ensure_node(&mut self, id: &str, label: &str, kind: NodeKind) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(Node {
            id: id.to_string(),
            label: label.to_string(),
            kind,
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Add an edge unless one already links `source` to `target`.
    ///
    /// Returns `false` when an edge was already present; its relation is kept.
    pub fn add_relation(&mut self, source: NodeIndex, target: NodeIndex, relation: Relation) -> bool {
        if self.graph.find_edge(source, target).is_some() {
            return false;
        }
        self.graph.add_edge(source, target, relation);
        true
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Person nodes in insertion order.
    pub fn people(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.kind == NodeKind::Person)
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<EdgeView> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (s, t) = self.graph.edge_endpoints(e)?;
                Some(EdgeView {
                    source: self.graph[s].id.clone(),
                    relation: self.graph[e],
                    target: self.graph[t].id.clone(),
                })
            })
            .collect()
    }

    /// Relation of the edge from `source` to `target`, if any.
    pub fn relation(&self, source: &str, target: &str) -> Option<Relation> {
        let s = *self.index.get(source)?;
        let t = *self.index.get(target)?;
        self.graph.find_edge(s, t).map(|e| self.graph[e])
    }

    /// Targets of `id`'s outgoing `relation` edges, in insertion order.
    pub fn targets(&self, id: &str, relation: Relation) -> Vec<&Node> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == relation)
            .map(|e| (e.id(), e.target()))
            .collect();
        out.sort_by_key(|(e, _)| *e);
        out.into_iter().map(|(_, t)| &self.graph[t]).collect()
    }

    /// Number of incoming edges of `id`.
    pub fn in_degree(&self, id: &str) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_node_dedupes_by_id() {
        let mut g = AffiliationGraph::new();
        let a = g.ensure_node("MIT", "MIT", NodeKind::Organization);
        let b = g.ensure_node("MIT", "MIT", NodeKind::Location);
        assert_eq!(a, b);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("MIT").unwrap().kind, NodeKind::Organization);
    }

    #[test]
    fn test_add_relation_keeps_first_edge() {
        let mut g = AffiliationGraph::new();
        let a = g.ensure_node("A", "A", NodeKind::Organization);
        let b = g.ensure_node("B", "B", NodeKind::Organization);
        assert!(g.add_relation(a, b, Relation::PartOf));
        assert!(!g.add_relation(a, b, Relation::LocatedIn));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.relation("A", "B"), Some(Relation::PartOf));
        assert_eq!(g.relation("B", "A"), None);
    }

    #[test]
    fn test_targets_in_insertion_order() {
        let mut g = AffiliationGraph::new();
        let p = g.ensure_node("Ann", "Ann", NodeKind::Person);
        for name in ["X", "Y", "Z"] {
            let o = g.ensure_node(name, name, NodeKind::Organization);
            g.add_relation(p, o, Relation::AffiliatedWith);
        }
        let ids: Vec<_> = g
            .targets("Ann", Relation::AffiliatedWith)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["X", "Y", "Z"]);
        assert!(g.targets("Ann", Relation::PartOf).is_empty());
        assert!(g.targets("nobody", Relation::AffiliatedWith).is_empty());
    }

    #[test]
    fn test_edges_listing_and_export() {
        let mut g = AffiliationGraph::new();
        let p = g.ensure_node("Ann", "Ann", NodeKind::Person);
        let o = g.ensure_node("Lab, MIT", "Lab", NodeKind::Organization);
        g.add_relation(p, o, Relation::AffiliatedWith);
        assert_eq!(
            g.edges(),
            vec![EdgeView {
                source: "Ann".into(),
                relation: Relation::AffiliatedWith,
                target: "Lab, MIT".into(),
            }]
        );
        let json = serde_json::to_value(g.export()).unwrap();
        assert_eq!(json["nodes"][1]["kind"], "organization");
        assert_eq!(json["nodes"][1]["label"], "Lab");
        assert_eq!(json["edges"][0]["relation"], "affiliated_with");
        assert_eq!(g.people().count(), 1);
        assert_eq!(g.in_degree("Lab, MIT"), 1);
    }

    #[test]
    fn test_kind_for_head() {
        assert_eq!(
            NodeKind::for_affiliation_head(EntityLabel::Org),
            NodeKind::Organization
        );
        assert_eq!(
            NodeKind::for_affiliation_head(EntityLabel::Gpe),
            NodeKind::Location
        );
    }
}
