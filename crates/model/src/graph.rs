use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    flight::Flight,
    route::{Route, TransportKind},
    stop::Stop,
    Location,
};

/// Graph node. Edges reference nodes by stop id only; the node itself is
/// resolved from the node map on demand, which keeps the graph free of
/// reference cycles and plainly serializable.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: Id<Stop>,
    pub name: String,
    pub location: Option<Location>,
    pub city: String,
}

impl Node {
    pub fn of_stop(stop: &Stop) -> Self {
        Self {
            id: stop.id.clone(),
            name: stop.name.clone(),
            location: stop.location,
            city: stop.city.clone(),
        }
    }
}

/// Static description of one route segment, shared by the edge and by every
/// itinerary leg that rides it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub segment_id: String,
    pub route_id: Id<Route>,
    pub kind: TransportKind,
    pub is_virtual: bool,
    pub distance_km: Option<f64>,
    pub duration_estimate_min: Option<f64>,
    pub base_price: Option<f64>,
}

/// Directed weighted edge. The weight is always a finite number greater than
/// zero; the builder rejects anything else before publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: Id<Stop>,
    pub to: Id<Stop>,
    pub segment: Segment,
    pub weight: f64,
    pub flights: Vec<Flight>,
}

/// Violated graph invariant. Any of these is fatal for the build that
/// produced the graph; the previously published graph stays active.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    OrphanEdge {
        from: String,
        to: String,
    },
    NonPositiveWeight {
        from: String,
        to: String,
        weight: f64,
    },
    MissingReciprocalVirtualEdge {
        from: String,
        to: String,
    },
    KeyMismatch,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::OrphanEdge { from, to } => {
                write!(f, "edge {from} -> {to} references a missing node")
            }
            InvariantViolation::NonPositiveWeight { from, to, weight } => {
                write!(f, "edge {from} -> {to} has invalid weight {weight}")
            }
            InvariantViolation::MissingReciprocalVirtualEdge { from, to } => {
                write!(
                    f,
                    "virtual edge {from} -> {to} has no reciprocal edge"
                )
            }
            InvariantViolation::KeyMismatch => {
                write!(f, "node map and adjacency map keys differ")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Directed weighted multigraph over the stops of one dataset.
///
/// Both maps preserve insertion order. That order is semantic: the path
/// finder breaks distance ties in favor of the neighbor inserted first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    adjacency: IndexMap<String, Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        let key = node.id.raw();
        self.adjacency.entry(key.clone()).or_default();
        self.nodes.insert(key, node);
    }

    /// Adds an edge if both endpoints are present. Returns whether the edge
    /// was added.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.contains_node(&edge.from) || !self.contains_node(&edge.to) {
            return false;
        }
        self.adjacency
            .entry(edge.from.raw())
            .or_default()
            .push(edge);
        true
    }

    pub fn contains_node(&self, id: &Id<Stop>) -> bool {
        self.nodes.contains_key(id.raw_ref::<str>())
    }

    pub fn node(&self, id: &Id<Stop>) -> Option<&Node> {
        self.nodes.get(id.raw_ref::<str>())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Position of a node in insertion order, if present.
    pub fn node_index(&self, id: &Id<Stop>) -> Option<usize> {
        self.nodes.get_index_of(id.raw_ref::<str>())
    }

    pub fn out_edges(&self, id: &Id<Stop>) -> &[Edge] {
        self.adjacency
            .get(id.raw_ref::<str>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.adjacency.values().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// First node whose canonical city matches, in insertion order.
    pub fn node_in_city(&self, city: &str) -> Option<&Node> {
        self.nodes.values().find(|node| node.city == city)
    }

    /// Drops adjacency entries and edges that reference nodes which no longer
    /// exist, and restores the node-key/adjacency-key correspondence. Returns
    /// the number of removed edges.
    pub fn synchronize(&mut self) -> usize {
        let mut removed = 0;

        let stale_keys: Vec<String> = self
            .adjacency
            .keys()
            .filter(|key| !self.nodes.contains_key(*key))
            .cloned()
            .collect();
        for key in stale_keys {
            if let Some(edges) = self.adjacency.shift_remove(&key) {
                removed += edges.len();
            }
        }

        for edges in self.adjacency.values_mut() {
            let before = edges.len();
            edges.retain(|edge| {
                self.nodes.contains_key(edge.to.raw_ref::<str>())
            });
            removed += before - edges.len();
        }

        for key in self.nodes.keys() {
            if !self.adjacency.contains_key(key) {
                self.adjacency.insert(key.clone(), Vec::new());
            }
        }

        removed
    }

    /// Checks every structural invariant of the published graph: edge
    /// endpoints resolve, weights are finite and positive, virtual edges
    /// close bidirectionally, and the two maps share one key set.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.nodes.len() != self.adjacency.len()
            || self
                .nodes
                .keys()
                .any(|key| !self.adjacency.contains_key(key))
        {
            return Err(InvariantViolation::KeyMismatch);
        }

        for (from_key, edges) in &self.adjacency {
            if !self.nodes.contains_key(from_key) {
                return Err(InvariantViolation::KeyMismatch);
            }
            for edge in edges {
                if !self.contains_node(&edge.from)
                    || !self.contains_node(&edge.to)
                {
                    return Err(InvariantViolation::OrphanEdge {
                        from: edge.from.raw(),
                        to: edge.to.raw(),
                    });
                }
                if !edge.weight.is_finite() || edge.weight <= 0.0 {
                    return Err(InvariantViolation::NonPositiveWeight {
                        from: edge.from.raw(),
                        to: edge.to.raw(),
                        weight: edge.weight,
                    });
                }
                if edge.segment.is_virtual && !self.has_edge(&edge.to, &edge.from)
                {
                    return Err(
                        InvariantViolation::MissingReciprocalVirtualEdge {
                            from: edge.from.raw(),
                            to: edge.to.raw(),
                        },
                    );
                }
            }
        }

        Ok(())
    }

    pub fn has_edge(&self, from: &Id<Stop>, to: &Id<Stop>) -> bool {
        self.out_edges(from).iter().any(|edge| &edge.to == to)
    }
}

/// Counts and provenance of the active graph, persisted alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub built_at: DateTime<Utc>,
    pub dataset_version: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, city: &str) -> Node {
        Node {
            id: Id::new(id.to_owned()),
            name: id.to_owned(),
            location: None,
            city: city.to_owned(),
        }
    }

    fn edge(from: &str, to: &str, weight: f64, is_virtual: bool) -> Edge {
        Edge {
            from: Id::new(from.to_owned()),
            to: Id::new(to.to_owned()),
            segment: Segment {
                segment_id: format!("{from}-{to}"),
                route_id: Id::new(format!("route-{from}-{to}")),
                kind: TransportKind::Bus,
                is_virtual,
                distance_km: None,
                duration_estimate_min: None,
                base_price: None,
            },
            weight,
            flights: Vec::new(),
        }
    }

    #[test]
    fn add_edge_requires_both_endpoints() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "x"));
        assert!(!graph.add_edge(edge("a", "b", 10.0, false)));
        graph.add_node(node("b", "y"));
        assert!(graph.add_edge(edge("a", "b", 10.0, false)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn synchronize_removes_edges_to_missing_nodes() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "x"));
        graph.add_node(node("b", "y"));
        graph.add_edge(edge("a", "b", 10.0, false));

        // simulate a node disappearing after edges were added
        graph.nodes.shift_remove("b");
        let removed = graph.synchronize();

        assert_eq!(removed, 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_weight() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "x"));
        graph.add_node(node("b", "y"));
        graph.add_edge(edge("a", "b", 0.0, false));
        assert!(matches!(
            graph.validate(),
            Err(InvariantViolation::NonPositiveWeight { .. })
        ));
    }

    #[test]
    fn validate_requires_virtual_reciprocal() {
        let mut graph = Graph::new();
        graph.add_node(node("a", "x"));
        graph.add_node(node("b", "y"));
        graph.add_edge(edge("a", "b", 60.0, true));
        assert!(matches!(
            graph.validate(),
            Err(InvariantViolation::MissingReciprocalVirtualEdge { .. })
        ));

        graph.add_edge(edge("b", "a", 60.0, true));
        assert!(graph.validate().is_ok());
    }
}
