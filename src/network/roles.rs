//! Coordinator and mothership role identification.

use super::{CentralityScore, VesselGraph};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Role of a coordinator vessel, by centrality thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorRole {
    /// High betweenness and high degree: runs the show
    CentralCoordinator,
    /// High betweenness: links otherwise separate groups
    BridgeCoordinator,
    /// High degree: many direct contacts
    HubCoordinator,
    MinorCoordinator,
}

impl CoordinatorRole {
    fn classify(betweenness: f64, degree: f64) -> Self {
        if betweenness > 0.1 && degree > 0.2 {
            CoordinatorRole::CentralCoordinator
        } else if betweenness > 0.05 {
            CoordinatorRole::BridgeCoordinator
        } else if degree > 0.15 {
            CoordinatorRole::HubCoordinator
        } else {
            CoordinatorRole::MinorCoordinator
        }
    }
}

/// A vessel whose graph position suggests a coordination role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinator {
    pub mmsi: u32,
    pub vessel_type: Option<String>,
    pub betweenness_centrality: f64,
    pub degree_centrality: f64,
    pub connections: usize,
    pub event_count: usize,
    pub total_risk: f64,
    pub coordinator_score: f64,
    pub role: CoordinatorRole,
}

/// A non-fishing vessel repeatedly close to fishing vessels: a candidate
/// support/transshipment vessel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mothership {
    pub mmsi: u32,
    pub vessel_type: Option<String>,
    pub total_connections: usize,
    pub fishing_connections: usize,
    /// Sum of co-occurrence counts over all edges
    pub total_encounters: u64,
    pub event_count: usize,
    pub total_risk: f64,
    pub mothership_score: f64,
}

/// Vessels with a significant coordination position
/// (`betweenness > 0.01` or `degree centrality > 0.1`), scored
/// `100·betweenness + 50·degree` and sorted by score descending.
pub fn identify_coordinators(centrality: &[CentralityScore]) -> Vec<Coordinator> {
    let mut coordinators: Vec<Coordinator> = centrality
        .iter()
        .filter(|score| score.betweenness_centrality > 0.01 || score.degree_centrality > 0.1)
        .map(|score| Coordinator {
            mmsi: score.mmsi,
            vessel_type: score.vessel_type.clone(),
            betweenness_centrality: score.betweenness_centrality,
            degree_centrality: score.degree_centrality,
            connections: score.connections,
            event_count: score.event_count,
            total_risk: score.total_risk,
            coordinator_score: 100.0 * score.betweenness_centrality
                + 50.0 * score.degree_centrality,
            role: CoordinatorRole::classify(score.betweenness_centrality, score.degree_centrality),
        })
        .collect();

    coordinators.sort_by(|a, b| {
        b.coordinator_score
            .partial_cmp(&a.coordinator_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.mmsi.cmp(&b.mmsi))
    });

    info!(coordinators = coordinators.len(), "coordinator identification complete");
    coordinators
}

/// Non-fishing vessels with at least two neighbors of which at least two
/// are fishing vessels, scored `10·fishing + 5·encounters` and sorted by
/// score descending.
pub fn identify_motherships(graph: &VesselGraph) -> Vec<Mothership> {
    let mut motherships: Vec<Mothership> = graph
        .node_indices()
        .filter_map(|node| {
            let weight = &graph[node];
            if weight.is_fishing {
                return None;
            }
            let neighbors: Vec<_> = graph.neighbors(node).collect();
            if neighbors.len() < 2 {
                return None;
            }
            let fishing_connections =
                neighbors.iter().filter(|&&n| graph[n].is_fishing).count();
            if fishing_connections < 2 {
                return None;
            }

            let total_encounters: u64 =
                graph.edges(node).map(|edge| u64::from(edge.weight().weight)).sum();
            #[allow(clippy::cast_precision_loss)]
            let mothership_score =
                10.0 * fishing_connections as f64 + 5.0 * total_encounters as f64;

            Some(Mothership {
                mmsi: weight.mmsi,
                vessel_type: weight.vessel_type.clone(),
                total_connections: neighbors.len(),
                fishing_connections,
                total_encounters,
                event_count: weight.event_count,
                total_risk: weight.total_risk,
                mothership_score,
            })
        })
        .collect();

    motherships.sort_by(|a, b| {
        b.mothership_score
            .partial_cmp(&a.mothership_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.mmsi.cmp(&b.mmsi))
    });

    info!(motherships = motherships.len(), "mothership identification complete");
    motherships
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::centrality_scores;
    use crate::network::test_support::{graph_from_edges, two_cliques_with_bridge};

    #[test]
    fn role_thresholds() {
        assert_eq!(CoordinatorRole::classify(0.2, 0.3), CoordinatorRole::CentralCoordinator);
        assert_eq!(CoordinatorRole::classify(0.06, 0.1), CoordinatorRole::BridgeCoordinator);
        assert_eq!(CoordinatorRole::classify(0.02, 0.2), CoordinatorRole::HubCoordinator);
        assert_eq!(CoordinatorRole::classify(0.02, 0.05), CoordinatorRole::MinorCoordinator);
        // high betweenness without degree stays a bridge, not central
        assert_eq!(CoordinatorRole::classify(0.2, 0.1), CoordinatorRole::BridgeCoordinator);
    }

    #[test]
    fn bridge_endpoints_lead_coordinators() {
        let graph = two_cliques_with_bridge();
        let centrality = centrality_scores(&graph);
        let coordinators = identify_coordinators(&centrality);

        assert!(!coordinators.is_empty());
        // both bridge endpoints outrank every interior clique member
        assert_eq!(coordinators[0].mmsi.min(coordinators[1].mmsi), 105);
        assert_eq!(coordinators[0].mmsi.max(coordinators[1].mmsi), 201);
        // betweenness 0.556 and degree 0.556 exceed the central thresholds
        assert_eq!(coordinators[0].role, CoordinatorRole::CentralCoordinator);
        let expected = 100.0 * (40.0 / 72.0) + 50.0 * (5.0 / 9.0);
        assert!((coordinators[0].coordinator_score - expected).abs() < 1e-6);
    }

    #[test]
    fn low_centrality_vessels_are_not_coordinators() {
        // a lone edge: degree centrality 1.0 in a 2-node graph still gates in,
        // so use a star where leaves fall below both gates
        let graph = graph_from_edges(&[(1, 2), (1, 3), (1, 4), (1, 5), (1, 6), (1, 7), (1, 8), (1, 9), (1, 10), (1, 11), (1, 12)]);
        let centrality = centrality_scores(&graph);
        let coordinators = identify_coordinators(&centrality);
        // only the hub passes the gate: leaves have degree 1/11 and zero betweenness
        assert_eq!(coordinators.len(), 1);
        assert_eq!(coordinators[0].mmsi, 1);
    }

    #[test]
    fn mothership_requires_two_fishing_neighbors() {
        let mut graph = graph_from_edges(&[(50, 1), (50, 2), (50, 3), (60, 1)]);
        for node in graph.node_indices() {
            let mmsi = graph[node].mmsi;
            graph.node_weight_mut(node).expect("node").is_fishing = mmsi < 50;
        }
        let motherships = identify_motherships(&graph);

        // vessel 50: 3 neighbors, all fishing. vessel 60: only one neighbor.
        assert_eq!(motherships.len(), 1);
        let mothership = &motherships[0];
        assert_eq!(mothership.mmsi, 50);
        assert_eq!(mothership.fishing_connections, 3);
        assert_eq!(mothership.total_connections, 3);
        assert_eq!(mothership.total_encounters, 3);
        assert!((mothership.mothership_score - (30.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn fishing_vessels_are_never_motherships() {
        let mut graph = graph_from_edges(&[(50, 1), (50, 2)]);
        for node in graph.node_indices() {
            graph.node_weight_mut(node).expect("node").is_fishing = true;
        }
        assert!(identify_motherships(&graph).is_empty());
    }

    #[test]
    fn empty_graph_produces_empty_outputs() {
        let graph = VesselGraph::default();
        assert!(identify_motherships(&graph).is_empty());
        assert!(identify_coordinators(&centrality_scores(&graph)).is_empty());
    }
}
