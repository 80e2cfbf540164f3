use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use wayfinder_core::model::Connection;

pub const REVERSE_PREFIX: &str = "Reverse of ";

#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("connection {source_id} -> {target_id} references unknown location {missing}")]
    UnknownEndpoint {
        source_id: u64,
        target_id: u64,
        missing: u64,
    },
    #[error("connection {source_id} -> {target_id} has non-positive distance {distance}")]
    InvalidDistance {
        source_id: u64,
        target_id: u64,
        distance: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub target: u64,
    pub weight: f32,
    pub direction: String,
}

/// Venue connectivity: every persisted connection becomes a forward edge and
/// a synthesized reverse edge labelled `"Reverse of {direction}"`.
#[derive(Debug, Clone, Default)]
pub struct VenueGraph {
    adjacency: HashMap<u64, Vec<GraphEdge>>,
    names: HashMap<u64, String>,
}

impl VenueGraph {
    /// `names` maps every valid location id to its display name; endpoints
    /// outside it are rejected.
    pub fn load(
        connections: &[Connection],
        names: HashMap<u64, String>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self {
            adjacency: HashMap::new(),
            names,
        };

        for conn in connections {
            for endpoint in [conn.source_id, conn.target_id] {
                if !graph.names.contains_key(&endpoint) {
                    return Err(GraphError::UnknownEndpoint {
                        source_id: conn.source_id,
                        target_id: conn.target_id,
                        missing: endpoint,
                    });
                }
            }
            if !(conn.distance.is_finite() && conn.distance > 0.0) {
                return Err(GraphError::InvalidDistance {
                    source_id: conn.source_id,
                    target_id: conn.target_id,
                    distance: conn.distance,
                });
            }
            graph.add_connection(conn);
        }

        Ok(graph)
    }

    fn add_connection(&mut self, conn: &Connection) {
        self.adjacency
            .entry(conn.source_id)
            .or_default()
            .push(GraphEdge {
                target: conn.target_id,
                weight: conn.distance,
                direction: conn.direction.clone(),
            });

        // Literal prefix, not a compass inversion.
        self.adjacency
            .entry(conn.target_id)
            .or_default()
            .push(GraphEdge {
                target: conn.source_id,
                weight: conn.distance,
                direction: format!("{}{}", REVERSE_PREFIX, conn.direction),
            });
    }

    /// True when the id appears as an endpoint of some connection.
    pub fn contains(&self, id: u64) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Outgoing edges in load order.
    pub fn neighbors(&self, id: u64) -> &[GraphEdge] {
        self.adjacency
            .get(&id)
            .map(|edges| edges.as_slice())
            .unwrap_or_default()
    }

    /// Stored name, or `"Line {id}"` for ids without one.
    pub fn name_of(&self, id: u64) -> Cow<'_, str> {
        match self.names.get(&id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("Line {}", id)),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}
