use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use storage::index::VenueGraph;
use thiserror::Error;
use wayfinder_core::error::{ErrorCode, WayfinderError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance: f32,
    /// Node ids from start to end, both included.
    pub path: Vec<u64>,
    /// `steps[i]` describes the move from `path[i]` to `path[i + 1]`.
    pub steps: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("location {0} is not on the map")]
    LocationNotFound(u64),
    #[error("no path from location {from} to location {to}")]
    NoPath { from: u64, to: u64 },
}

impl WayfinderError for RouteError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RouteError::LocationNotFound(_) => ErrorCode::NotFound,
            RouteError::NoPath { .. } => ErrorCode::NoPath,
        }
    }
}

/// Priority queue entry. `BinaryHeap` is a max-heap, so the ordering is
/// reversed: smaller distance first, then smaller node id.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    distance: f32,
    node: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Dijkstra over the venue graph.
///
/// Ties are broken explicitly: equal-distance queue entries pop lowest node
/// id first, and a node reached at equal cost from two predecessors keeps the
/// lower predecessor id. Between parallel edges of equal weight the one
/// stored first wins.
pub fn shortest_path(graph: &VenueGraph, start: u64, end: u64) -> Result<Route, RouteError> {
    for id in [start, end] {
        if !graph.contains(id) {
            return Err(RouteError::LocationNotFound(id));
        }
    }

    let mut best: HashMap<u64, f32> = HashMap::new();
    // node -> (predecessor, index of the edge in the predecessor's list)
    let mut came_from: HashMap<u64, (u64, usize)> = HashMap::new();
    let mut settled: HashSet<u64> = HashSet::new();
    let mut queue = BinaryHeap::new();

    best.insert(start, 0.0);
    queue.push(QueueEntry {
        distance: 0.0,
        node: start,
    });

    while let Some(QueueEntry { distance, node }) = queue.pop() {
        if !settled.insert(node) {
            continue;
        }

        if node == end {
            return Ok(build_route(graph, start, end, distance, &came_from));
        }

        for (idx, edge) in graph.neighbors(node).iter().enumerate() {
            if settled.contains(&edge.target) {
                continue;
            }

            let tentative = distance + edge.weight;
            match best.get(&edge.target) {
                Some(&known) if tentative > known => continue,
                Some(&known) if tentative == known => {
                    if let Some(&(prev, _)) = came_from.get(&edge.target) {
                        if node < prev {
                            came_from.insert(edge.target, (node, idx));
                        }
                    }
                    continue;
                }
                _ => {}
            }

            best.insert(edge.target, tentative);
            came_from.insert(edge.target, (node, idx));
            queue.push(QueueEntry {
                distance: tentative,
                node: edge.target,
            });
        }
    }

    Err(RouteError::NoPath {
        from: start,
        to: end,
    })
}

fn build_route(
    graph: &VenueGraph,
    start: u64,
    end: u64,
    distance: f32,
    came_from: &HashMap<u64, (u64, usize)>,
) -> Route {
    let mut hops = Vec::new();
    let mut node = end;
    while node != start {
        let Some(&(prev, idx)) = came_from.get(&node) else {
            break;
        };
        hops.push((prev, idx));
        node = prev;
    }
    hops.reverse();

    let mut path = Vec::with_capacity(hops.len() + 1);
    let mut steps = Vec::with_capacity(hops.len());
    path.push(start);
    for (from, idx) in hops {
        let edge = &graph.neighbors(from)[idx];
        steps.push(format!(
            "Go {} for {}m to {}",
            edge.direction,
            edge.weight,
            graph.name_of(edge.target)
        ));
        path.push(edge.target);
    }

    Route {
        distance,
        path,
        steps,
    }
}
