use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use itertools::Itertools;
use model::{graph::Edge, graph::Graph, stop::Stop};
use utility::id::Id;

/// An ordered list of traversed edges. `total_weight` is the sum of edge
/// weights; real durations and prices are attached downstream by the
/// itinerary assembler.
#[derive(Debug, Clone)]
pub struct PathResult {
    pub edges: Vec<Edge>,
    pub total_weight: f64,
}

impl PathResult {
    fn of(edges: Vec<Edge>) -> Self {
        let total_weight = edges.iter().map(|edge| edge.weight).sum();
        Self {
            edges,
            total_weight,
        }
    }

    pub fn stop_ids(&self) -> Vec<Id<Stop>> {
        let mut stops: Vec<Id<Stop>> = self
            .edges
            .first()
            .map(|edge| vec![edge.from.clone()])
            .unwrap_or_default();
        stops.extend(self.edges.iter().map(|edge| edge.to.clone()));
        stops
    }
}

struct HeapEntry {
    distance: f64,
    sequence: u64,
    stop: Id<Stop>,
}

// Min-heap semantics on a max-heap: smaller distance compares greater. Ties
// go to the entry pushed first, which is the neighbor inserted into the
// adjacency list first, because relaxation walks adjacency in order.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Dijkstra over the published graph. Edge weights are guaranteed positive
/// by the weight audit, so the first extraction of a node fixes its
/// distance; extraction of the destination ends the search early.
///
/// Returns `None` when either endpoint is absent or no path connects them.
pub fn shortest_path(
    graph: &Graph,
    from: &Id<Stop>,
    to: &Id<Stop>,
) -> Option<PathResult> {
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return None;
    }

    let mut distances: HashMap<String, f64> = HashMap::new();
    let mut previous: HashMap<String, Edge> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut heap = BinaryHeap::new();
    let mut sequence = 0u64;

    distances.insert(from.raw(), 0.0);
    heap.push(HeapEntry {
        distance: 0.0,
        sequence,
        stop: from.clone(),
    });

    while let Some(entry) = heap.pop() {
        if visited.contains(entry.stop.raw_ref::<str>()) {
            continue;
        }
        visited.insert(entry.stop.raw());

        if &entry.stop == to {
            break;
        }

        for edge in graph.out_edges(&entry.stop) {
            if visited.contains(edge.to.raw_ref::<str>()) {
                continue;
            }
            let tentative = entry.distance + edge.weight;
            let current = distances
                .get(edge.to.raw_ref::<str>())
                .copied()
                .unwrap_or(f64::INFINITY);
            if tentative < current {
                distances.insert(edge.to.raw(), tentative);
                previous.insert(edge.to.raw(), edge.clone());
                sequence += 1;
                heap.push(HeapEntry {
                    distance: tentative,
                    sequence,
                    stop: edge.to.clone(),
                });
            }
        }
    }

    if !visited.contains(to.raw_ref::<str>()) {
        return None;
    }

    // walk back-pointers from destination to origin
    let mut edges = Vec::new();
    let mut cursor = to.clone();
    while &cursor != from {
        let edge = previous.get(cursor.raw_ref::<str>())?.clone();
        cursor = edge.from.clone();
        edges.push(edge);
    }
    edges.reverse();
    Some(PathResult::of(edges))
}

/// Every simple path between two nodes up to `max_depth` edges, sorted by
/// total weight. Exhaustive, so diagnostics only; the hot path never calls
/// this.
pub fn find_all_paths(
    graph: &Graph,
    from: &Id<Stop>,
    to: &Id<Stop>,
    max_depth: usize,
) -> Vec<PathResult> {
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut trail: Vec<Edge> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(from.raw());
    walk(graph, from, to, max_depth, &mut trail, &mut visited, &mut results);

    results
        .into_iter()
        .sorted_by(|a, b| {
            a.total_weight
                .partial_cmp(&b.total_weight)
                .unwrap_or(Ordering::Equal)
        })
        .collect()
}

fn walk(
    graph: &Graph,
    at: &Id<Stop>,
    to: &Id<Stop>,
    remaining: usize,
    trail: &mut Vec<Edge>,
    visited: &mut HashSet<String>,
    results: &mut Vec<PathResult>,
) {
    if at == to {
        results.push(PathResult::of(trail.clone()));
        return;
    }
    if remaining == 0 {
        return;
    }
    for edge in graph.out_edges(at) {
        if visited.contains(edge.to.raw_ref::<str>()) {
            continue;
        }
        visited.insert(edge.to.raw());
        trail.push(edge.clone());
        walk(graph, &edge.to, to, remaining - 1, trail, visited, results);
        trail.pop();
        visited.remove(edge.to.raw_ref::<str>());
    }
}
