//! Vessel Coordination Network Module (C8)
//!
//! Builds an undirected weighted graph over vessels from scored dark events
//! and the raw fix stream: an edge means two vessels were within the
//! proximity threshold during a dark event's window, weighted by how often.
//! On top of the graph: centrality metrics (degree, betweenness, closeness),
//! seeded Louvain community detection, coordinator role classification, and
//! mothership identification.
//!
//! The graph is built once and read-only; every algorithm takes `&VesselGraph`.

mod builder;
mod centrality;
mod community;
mod roles;

pub use builder::build_vessel_graph;
pub use centrality::{centrality_scores, CentralityScore};
pub use community::{detect_communities, Community, SuspicionLevel};
pub use roles::{
    identify_coordinators, identify_motherships, Coordinator, CoordinatorRole, Mothership,
};

use crate::types::Position;
use chrono::{DateTime, Utc};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// Node attributes: one vessel and its aggregated dark-event history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VesselNode {
    pub mmsi: u32,
    pub vessel_type: Option<String>,
    /// Scored dark events attributed to this vessel
    pub event_count: usize,
    pub total_risk: f64,
    pub avg_risk: f64,
    pub is_fishing: bool,
}

/// One logged co-occurrence backing an edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncounterRecord {
    pub timestamp: DateTime<Utc>,
    pub location: Position,
}

/// Edge attributes: co-occurrence count plus the encounter log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeLog {
    pub weight: u32,
    pub encounters: Vec<EncounterRecord>,
}

/// The coordination graph: contiguous node/edge storage with adjacency,
/// handed to all algorithms as an immutable view.
pub type VesselGraph = UnGraph<VesselNode, EdgeLog>;

/// Headline numbers describing the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkStats {
    pub total_vessels: usize,
    pub total_connections: usize,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub average_degree: f64,
    pub density: f64,
}

/// Compute connected components by BFS, each as a sorted node list.
/// Components are ordered by their smallest node index.
pub(crate) fn connected_components(graph: &VesselGraph) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; graph.node_count()];
    let mut components = Vec::new();

    for start in graph.node_indices() {
        if seen[start.index()] {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen[start.index()] = true;
        while let Some(node) = queue.pop_front() {
            component.push(node);
            for neighbor in graph.neighbors(node) {
                if !seen[neighbor.index()] {
                    seen[neighbor.index()] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Summarize the graph. An empty graph yields all-zero stats.
pub fn network_stats(graph: &VesselGraph) -> NetworkStats {
    let n = graph.node_count();
    let e = graph.edge_count();
    let components = connected_components(graph);

    let stats = NetworkStats {
        total_vessels: n,
        total_connections: e,
        connected_components: components.len(),
        largest_component_size: components.iter().map(Vec::len).max().unwrap_or(0),
        average_degree: if n > 0 { 2.0 * e as f64 / n as f64 } else { 0.0 },
        density: if n > 1 {
            2.0 * e as f64 / (n as f64 * (n - 1) as f64)
        } else {
            0.0
        },
    };
    info!(
        vessels = stats.total_vessels,
        connections = stats.total_connections,
        components = stats.connected_components,
        "network statistics computed"
    );
    stats
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a graph from `(mmsi_a, mmsi_b)` edges, default attributes.
    pub fn graph_from_edges(edges: &[(u32, u32)]) -> VesselGraph {
        let mut graph = VesselGraph::default();
        let mut index = std::collections::BTreeMap::new();
        let mut mmsis: Vec<u32> = edges.iter().flat_map(|&(a, b)| [a, b]).collect();
        mmsis.sort_unstable();
        mmsis.dedup();
        for mmsi in mmsis {
            let node = graph.add_node(VesselNode {
                mmsi,
                vessel_type: None,
                event_count: 0,
                total_risk: 0.0,
                avg_risk: 0.0,
                is_fishing: false,
            });
            index.insert(mmsi, node);
        }
        for &(a, b) in edges {
            graph.add_edge(index[&a], index[&b], EdgeLog { weight: 1, encounters: Vec::new() });
        }
        graph
    }

    /// Two 5-cliques joined by a single bridge edge between 105 and 201.
    pub fn two_cliques_with_bridge() -> VesselGraph {
        let mut edges = Vec::new();
        let clique_a = [101u32, 102, 103, 104, 105];
        let clique_b = [201u32, 202, 203, 204, 205];
        for clique in [clique_a, clique_b] {
            for i in 0..clique.len() {
                for j in (i + 1)..clique.len() {
                    edges.push((clique[i], clique[j]));
                }
            }
        }
        edges.push((105, 201));
        graph_from_edges(&edges)
    }
}
