//! Centrality metrics over the immutable vessel graph.

use super::{connected_components, VesselGraph};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// Per-vessel centrality metrics plus the node attributes reporters need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CentralityScore {
    pub mmsi: u32,
    pub vessel_type: Option<String>,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
    /// Raw neighbor count
    pub connections: usize,
    pub event_count: usize,
    pub total_risk: f64,
    pub is_fishing: bool,
}

/// Compute degree, betweenness, and closeness centrality for every node,
/// sorted by betweenness descending (ties by MMSI).
///
/// Closeness is computed within the largest connected component when the
/// graph is disconnected; nodes outside it score 0. A single-node or empty
/// graph yields zeros everywhere.
pub fn centrality_scores(graph: &VesselGraph) -> Vec<CentralityScore> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let betweenness = betweenness_centrality(graph);
    let closeness = closeness_centrality(graph);

    let mut scores: Vec<CentralityScore> = graph
        .node_indices()
        .map(|node| {
            let weight = &graph[node];
            let degree = graph.neighbors(node).count();
            CentralityScore {
                mmsi: weight.mmsi,
                vessel_type: weight.vessel_type.clone(),
                degree_centrality: if n > 1 { degree as f64 / (n - 1) as f64 } else { 0.0 },
                betweenness_centrality: betweenness[node.index()],
                closeness_centrality: closeness[node.index()],
                connections: degree,
                event_count: weight.event_count,
                total_risk: weight.total_risk,
                is_fishing: weight.is_fishing,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.betweenness_centrality
            .partial_cmp(&a.betweenness_centrality)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.mmsi.cmp(&b.mmsi))
    });

    info!(vessels = scores.len(), "centrality metrics computed");
    scores
}

/// Brandes' algorithm for unweighted betweenness, normalized for an
/// undirected graph: raw pair-dependency sums divided by (n-1)(n-2).
fn betweenness_centrality(graph: &VesselGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut betweenness = vec![0.0_f64; n];
    if n < 3 {
        return betweenness;
    }

    for source in graph.node_indices() {
        // BFS from source, recording shortest-path counts and predecessors.
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![usize::MAX; n];
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut order: Vec<NodeIndex> = Vec::with_capacity(n);

        sigma[source.index()] = 1.0;
        dist[source.index()] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            for w in graph.neighbors(v) {
                if dist[w.index()] == usize::MAX {
                    dist[w.index()] = dist[v.index()] + 1;
                    queue.push_back(w);
                }
                if dist[w.index()] == dist[v.index()] + 1 {
                    sigma[w.index()] += sigma[v.index()];
                    predecessors[w.index()].push(v);
                }
            }
        }

        // Back-propagate dependencies in reverse BFS order.
        let mut delta = vec![0.0_f64; n];
        for &w in order.iter().rev() {
            for &v in &predecessors[w.index()] {
                delta[v.index()] +=
                    sigma[v.index()] / sigma[w.index()] * (1.0 + delta[w.index()]);
            }
            if w != source {
                betweenness[w.index()] += delta[w.index()];
            }
        }
    }

    let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
    for value in &mut betweenness {
        *value *= scale;
    }
    betweenness
}

/// Closeness centrality on the largest connected component:
/// `(|C| - 1) / sum of BFS distances` for members, 0 elsewhere.
fn closeness_centrality(graph: &VesselGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut closeness = vec![0.0_f64; n];

    let components = connected_components(graph);
    let Some(largest) = components.iter().max_by_key(|c| c.len()) else {
        return closeness;
    };
    if largest.len() < 2 {
        return closeness;
    }

    for &node in largest {
        // BFS distances within the component
        let mut dist = vec![usize::MAX; n];
        dist[node.index()] = 0;
        let mut queue = VecDeque::from([node]);
        let mut total = 0usize;
        while let Some(v) = queue.pop_front() {
            for w in graph.neighbors(v) {
                if dist[w.index()] == usize::MAX {
                    dist[w.index()] = dist[v.index()] + 1;
                    total += dist[w.index()];
                    queue.push_back(w);
                }
            }
        }
        closeness[node.index()] = (largest.len() - 1) as f64 / total as f64;
    }
    closeness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_support::{graph_from_edges, two_cliques_with_bridge};

    fn score_of(scores: &[CentralityScore], mmsi: u32) -> &CentralityScore {
        scores.iter().find(|s| s.mmsi == mmsi).expect("score present")
    }

    #[test]
    fn single_node_graph_scores_zero() {
        let mut graph = VesselGraph::default();
        graph.add_node(crate::network::VesselNode {
            mmsi: 1,
            vessel_type: None,
            event_count: 0,
            total_risk: 0.0,
            avg_risk: 0.0,
            is_fishing: false,
        });
        let scores = centrality_scores(&graph);
        assert_eq!(scores.len(), 1);
        assert!((scores[0].degree_centrality - 0.0).abs() < f64::EPSILON);
        assert!((scores[0].betweenness_centrality - 0.0).abs() < f64::EPSILON);
        assert!((scores[0].closeness_centrality - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_graph_yields_empty_scores() {
        assert!(centrality_scores(&VesselGraph::default()).is_empty());
    }

    #[test]
    fn path_graph_center_dominates() {
        // 1 - 2 - 3: node 2 sits on the only 1..3 path
        let graph = graph_from_edges(&[(1, 2), (2, 3)]);
        let scores = centrality_scores(&graph);

        let center = score_of(&scores, 2);
        assert!((center.degree_centrality - 1.0).abs() < f64::EPSILON);
        // one pair (1,3) routed through 2, scale 1/((3-1)(3-2)) applied to
        // both (s,t) and (t,s) accumulations: 2 * 0.5 = 1.0
        assert!((center.betweenness_centrality - 1.0).abs() < 1e-9);
        assert!((center.closeness_centrality - 1.0).abs() < f64::EPSILON);

        let leaf = score_of(&scores, 1);
        assert!((leaf.betweenness_centrality - 0.0).abs() < f64::EPSILON);
        assert!((leaf.closeness_centrality - 2.0 / 3.0).abs() < 1e-9);
        // output is sorted by betweenness, so the center leads
        assert_eq!(scores[0].mmsi, 2);
    }

    #[test]
    fn closeness_uses_largest_component_only() {
        let graph = graph_from_edges(&[(1, 2), (2, 3), (10, 11)]);
        let scores = centrality_scores(&graph);
        // members of the small component get zero closeness
        assert!((score_of(&scores, 10).closeness_centrality - 0.0).abs() < f64::EPSILON);
        assert!(score_of(&scores, 2).closeness_centrality > 0.0);
    }

    #[test]
    fn bridge_endpoints_carry_highest_betweenness() {
        let graph = two_cliques_with_bridge();
        let scores = centrality_scores(&graph);

        // 20 ordered of the 40 cross-clique pair-dependencies accumulate on
        // each endpoint; normalized: 40 / (9 * 8) = 0.5555...
        let endpoint = score_of(&scores, 105);
        assert!((endpoint.betweenness_centrality - 40.0 / 72.0).abs() < 1e-9);
        assert_eq!(scores[0].mmsi.min(scores[1].mmsi), 105);
        assert_eq!(scores[0].mmsi.max(scores[1].mmsi), 201);

        // interior clique members route nothing
        let interior = score_of(&scores, 103);
        assert!(interior.betweenness_centrality < endpoint.betweenness_centrality);
        // degree centrality: 5 neighbors of 9 possible
        assert!((endpoint.degree_centrality - 5.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn betweenness_symmetry_in_cycle() {
        // every node of a 4-cycle is equivalent
        let graph = graph_from_edges(&[(1, 2), (2, 3), (3, 4), (4, 1)]);
        let scores = centrality_scores(&graph);
        let first = scores[0].betweenness_centrality;
        for score in &scores {
            assert!((score.betweenness_centrality - first).abs() < 1e-12);
        }
    }
}
