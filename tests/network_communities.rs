//! Network Analysis Scenario Tests
//!
//! Builds the canonical two-cliques-with-a-bridge graph directly and checks
//! community detection, betweenness ranking, and coordinator flagging
//! against the documented thresholds.

use fishnet::network::{
    centrality_scores, detect_communities, identify_coordinators, identify_motherships,
    network_stats, CoordinatorRole, EdgeLog, VesselGraph, VesselNode,
};
use std::collections::BTreeMap;

fn node(mmsi: u32, is_fishing: bool) -> VesselNode {
    VesselNode {
        mmsi,
        vessel_type: None,
        event_count: 1,
        total_risk: 0.5,
        avg_risk: 0.5,
        is_fishing,
    }
}

/// Two 5-cliques (101-105, 201-205) joined by the single edge 105-201.
fn two_cliques_with_bridge() -> VesselGraph {
    let mut graph = VesselGraph::default();
    let mut index = BTreeMap::new();
    for mmsi in [101u32, 102, 103, 104, 105, 201, 202, 203, 204, 205] {
        index.insert(mmsi, graph.add_node(node(mmsi, true)));
    }
    for clique in [[101u32, 102, 103, 104, 105], [201, 202, 203, 204, 205]] {
        for i in 0..clique.len() {
            for j in (i + 1)..clique.len() {
                graph.add_edge(
                    index[&clique[i]],
                    index[&clique[j]],
                    EdgeLog { weight: 1, encounters: Vec::new() },
                );
            }
        }
    }
    graph.add_edge(index[&105], index[&201], EdgeLog { weight: 1, encounters: Vec::new() });
    graph
}

#[test]
fn louvain_splits_the_cliques_into_exactly_two_communities() {
    let graph = two_cliques_with_bridge();
    let communities = detect_communities(&graph, 42);

    assert_eq!(communities.len(), 2);
    let mut memberships: Vec<Vec<u32>> =
        communities.iter().map(|c| c.vessel_mmsis.clone()).collect();
    memberships.sort();
    assert_eq!(memberships[0], vec![101, 102, 103, 104, 105]);
    assert_eq!(memberships[1], vec![201, 202, 203, 204, 205]);

    for community in &communities {
        assert_eq!(community.size, 5);
        assert_eq!(community.internal_connections, 10);
        assert!((community.density - 1.0).abs() < f64::EPSILON);
    }
}

#[test]
fn bridge_endpoint_has_highest_betweenness_and_is_a_coordinator() {
    let graph = two_cliques_with_bridge();
    let centrality = centrality_scores(&graph);

    // the two bridge endpoints dominate betweenness
    let top: Vec<u32> = centrality[..2].iter().map(|s| s.mmsi).collect();
    assert!(top.contains(&105));
    assert!(top.contains(&201));
    assert!(
        centrality[0].betweenness_centrality > centrality[2].betweenness_centrality,
        "bridge endpoints strictly above clique interiors"
    );

    let coordinators = identify_coordinators(&centrality);
    let bridge = coordinators
        .iter()
        .find(|c| c.mmsi == 105)
        .expect("bridge endpoint flagged as coordinator");
    // betweenness ~0.556 and degree ~0.556 clear both central thresholds,
    // the most severe bridging role
    assert_eq!(bridge.role, CoordinatorRole::CentralCoordinator);
    assert!(bridge.coordinator_score > 0.0);

    // interior clique members have zero betweenness but pass the degree
    // gate; they must rank strictly below the bridge endpoints
    assert_eq!(coordinators[0].mmsi.min(coordinators[1].mmsi), 105);
    assert_eq!(coordinators[0].mmsi.max(coordinators[1].mmsi), 201);
}

#[test]
fn all_fishing_graph_has_no_motherships() {
    let graph = two_cliques_with_bridge();
    assert!(identify_motherships(&graph).is_empty());
}

#[test]
fn stats_reflect_the_bridge_topology() {
    let graph = two_cliques_with_bridge();
    let stats = network_stats(&graph);
    assert_eq!(stats.total_vessels, 10);
    assert_eq!(stats.total_connections, 21);
    assert_eq!(stats.connected_components, 1);
    assert_eq!(stats.largest_component_size, 10);
}
