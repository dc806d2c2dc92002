//! Community detection over the vessel graph.
//!
//! Louvain modularity maximization with a fixed seed: node visiting order
//! is shuffled deterministically per pass, ties break toward the lowest
//! community id, so a given graph and seed always yield the same partition.
//! When Louvain gives up (pass or level cap exhausted without converging),
//! detection falls back to greedy modularity maximization: agglomerative
//! merging of the best-gain community pair until no merge improves
//! modularity.

use super::VesselGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// Suspicion grading for a detected community.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspicionLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl SuspicionLevel {
    /// Thresholds on average risk per vessel and internal density.
    fn classify(avg_risk_per_vessel: f64, density: f64) -> Self {
        if avg_risk_per_vessel > 5.0 && density > 0.5 {
            SuspicionLevel::VeryHigh
        } else if avg_risk_per_vessel > 3.0 || density > 0.4 {
            SuspicionLevel::High
        } else if avg_risk_per_vessel > 1.5 || density > 0.25 {
            SuspicionLevel::Medium
        } else {
            SuspicionLevel::Low
        }
    }
}

/// A detected vessel community with aggregate risk statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Community {
    pub community_id: usize,
    pub size: usize,
    /// Sorted member MMSIs
    pub vessel_mmsis: Vec<u32>,
    pub total_risk_score: f64,
    pub avg_risk_score: f64,
    pub total_events: usize,
    pub internal_connections: usize,
    pub density: f64,
    pub suspicion_level: SuspicionLevel,
}

/// Detect communities and summarize them.
///
/// Seeded Louvain first; if it fails to converge within its caps, the
/// greedy modularity fallback partitions the graph instead. Singleton
/// communities are discarded. Ids are assigned by scanning communities in
/// order of their smallest member MMSI; the returned list is sorted by
/// total risk descending (ties by id). An empty or edgeless graph yields an
/// empty list.
pub fn detect_communities(graph: &VesselGraph, seed: u64) -> Vec<Community> {
    let partitions = match louvain_partition(graph, seed) {
        Some(partitions) => partitions,
        None => {
            warn!("Louvain did not converge, falling back to greedy modularity maximization");
            greedy_modularity_partition(graph)
        }
    };

    let mut kept: Vec<Vec<NodeIndex>> = partitions
        .into_iter()
        .filter(|members| members.len() >= 2)
        .collect();
    // Deterministic id assignment: order by smallest member MMSI.
    for members in &mut kept {
        members.sort_by_key(|&node| graph[node].mmsi);
    }
    kept.sort_by_key(|members| graph[members[0]].mmsi);

    let mut communities: Vec<Community> = kept
        .into_iter()
        .enumerate()
        .map(|(i, members)| {
            let size = members.len();
            let member_set: HashSet<NodeIndex> = members.iter().copied().collect();
            let internal_connections = graph
                .edge_indices()
                .filter(|&edge| {
                    graph
                        .edge_endpoints(edge)
                        .is_some_and(|(a, b)| member_set.contains(&a) && member_set.contains(&b))
                })
                .count();

            let total_risk_score: f64 = members.iter().map(|&node| graph[node].total_risk).sum();
            let total_events: usize = members.iter().map(|&node| graph[node].event_count).sum();
            let density = if size > 1 {
                2.0 * internal_connections as f64 / (size as f64 * (size - 1) as f64)
            } else {
                0.0
            };
            let avg_risk_score = total_risk_score / size as f64;

            Community {
                community_id: i + 1,
                size,
                vessel_mmsis: members.iter().map(|&node| graph[node].mmsi).collect(),
                total_risk_score,
                avg_risk_score,
                total_events,
                internal_connections,
                density,
                suspicion_level: SuspicionLevel::classify(avg_risk_score, density),
            }
        })
        .collect();

    communities.sort_by(|a, b| {
        b.total_risk_score
            .partial_cmp(&a.total_risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.community_id.cmp(&b.community_id))
    });

    info!(communities = communities.len(), "community detection complete");
    communities
}

/// One level of the Louvain hierarchy: a weighted graph in adjacency form.
struct Level {
    /// neighbor list per node as (node, weight); no self entries
    adjacency: Vec<Vec<(usize, f64)>>,
    /// accumulated intra-community weight folded into each super-node
    self_loops: Vec<f64>,
}

impl Level {
    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree: incident edge weights, self-loops counted twice.
    fn degree(&self, node: usize) -> f64 {
        self.adjacency[node].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self.self_loops[node]
    }

    fn total_weight(&self) -> f64 {
        let edges: f64 = self
            .adjacency
            .iter()
            .flat_map(|neighbors| neighbors.iter().map(|&(_, w)| w))
            .sum::<f64>()
            / 2.0;
        edges + self.self_loops.iter().sum::<f64>()
    }
}

/// Local-moving passes allowed per level before Louvain gives up. Each
/// move strictly increases modularity, so real graphs converge in a
/// handful of passes; hitting the cap means the float-gain comparisons are
/// oscillating instead of settling.
const MAX_LOCAL_PASSES: usize = 100;

/// Full Louvain: local moving + aggregation until modularity stops
/// improving. Returns the partition as node lists over the input graph, or
/// `None` when a cap was exhausted without converging (the caller falls
/// back to greedy modularity maximization). Every improving level shrinks
/// the graph by at least one node, so `n + 1` levels is a true upper bound
/// and exceeding it is the same oscillation symptom as the pass cap.
fn louvain_partition(graph: &VesselGraph, seed: u64) -> Option<Vec<Vec<NodeIndex>>> {
    let n = graph.node_count();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut level = Level {
        adjacency: graph
            .node_indices()
            .map(|node| {
                graph
                    .edges(node)
                    .map(|edge| {
                        let other = if edge.source() == node { edge.target() } else { edge.source() };
                        (other.index(), f64::from(edge.weight().weight))
                    })
                    .collect()
            })
            .collect(),
        self_loops: vec![0.0; n],
    };
    // membership of each original node across levels
    let mut membership: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..=n {
        let (assignment, improved) = local_moving(&level, &mut rng)?;
        if !improved {
            return Some(group_membership(&membership));
        }

        // Renumber communities densely in order of first appearance.
        let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
        for &community in &assignment {
            let next = renumber.len();
            renumber.entry(community).or_insert(next);
        }
        let community_count = renumber.len();
        let dense: Vec<usize> = assignment.iter().map(|c| renumber[c]).collect();

        for community in &mut membership {
            *community = dense[*community];
        }
        if community_count == level.node_count() {
            return Some(group_membership(&membership));
        }

        // Aggregate communities into super-nodes.
        let mut merged: Vec<HashMap<usize, f64>> = vec![HashMap::new(); community_count];
        let mut self_loops = vec![0.0_f64; community_count];
        for (node, &community) in dense.iter().enumerate() {
            self_loops[community] += level.self_loops[node];
            for &(other, weight) in &level.adjacency[node] {
                let other_community = dense[other];
                if other_community == community {
                    // both directions visit the pair, half each
                    self_loops[community] += weight / 2.0;
                } else {
                    *merged[community].entry(other_community).or_insert(0.0) += weight;
                }
            }
        }
        level = Level {
            adjacency: merged
                .into_iter()
                .map(|neighbors| {
                    let mut list: Vec<(usize, f64)> = neighbors.into_iter().collect();
                    list.sort_by_key(|&(node, _)| node);
                    list
                })
                .collect(),
            self_loops,
        };
    }

    // level cap exhausted without converging
    None
}

/// Collect a node-to-community mapping into per-community node lists.
fn group_membership(membership: &[usize]) -> Vec<Vec<NodeIndex>> {
    let mut groups: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for (node, &community) in membership.iter().enumerate() {
        groups.entry(community).or_default().push(NodeIndex::new(node));
    }
    groups.into_values().collect()
}

/// One local-moving phase. Returns the community assignment and whether any
/// node moved, or `None` when the pass cap was exhausted before the phase
/// settled.
fn local_moving(level: &Level, rng: &mut StdRng) -> Option<(Vec<usize>, bool)> {
    let n = level.node_count();
    let two_m = 2.0 * level.total_weight();
    if two_m == 0.0 || !two_m.is_finite() {
        return Some(((0..n).collect(), false));
    }

    let mut community: Vec<usize> = (0..n).collect();
    let degrees: Vec<f64> = (0..n).map(|node| level.degree(node)).collect();
    let mut sigma_tot: Vec<f64> = degrees.clone();

    let mut order: Vec<usize> = (0..n).collect();
    let mut improved = false;
    for _ in 0..MAX_LOCAL_PASSES {
        let mut moved = false;
        order.shuffle(rng);
        for &node in &order {
            let current = community[node];
            sigma_tot[current] -= degrees[node];

            // weight from node into each adjacent community
            let mut weight_to: BTreeMap<usize, f64> = BTreeMap::new();
            weight_to.insert(current, 0.0);
            for &(other, weight) in &level.adjacency[node] {
                *weight_to.entry(community[other]).or_insert(0.0) += weight;
            }

            // best gain; BTreeMap iteration makes ties land on the lowest id
            let mut best = (current, weight_to[&current] - sigma_tot[current] * degrees[node] / two_m);
            for (&candidate, &weight) in &weight_to {
                let gain = weight - sigma_tot[candidate] * degrees[node] / two_m;
                if gain > best.1 + 1e-12 {
                    best = (candidate, gain);
                }
            }

            sigma_tot[best.0] += degrees[node];
            if best.0 != current {
                community[node] = best.0;
                moved = true;
                improved = true;
            }
        }
        if !moved {
            return Some((community, improved));
        }
    }

    // pass cap exhausted without settling
    None
}

/// Greedy modularity maximization: start from singleton communities and
/// repeatedly merge the connected pair with the largest modularity gain
/// `e_ab/m - tot_a*tot_b/(2m^2)` until no merge improves modularity. Ties
/// break toward the lowest community id pair, so the partition is
/// deterministic without a seed.
fn greedy_modularity_partition(graph: &VesselGraph) -> Vec<Vec<NodeIndex>> {
    let n = graph.node_count();
    let mut membership: Vec<usize> = (0..n).collect();
    if n == 0 {
        return Vec::new();
    }

    let m: f64 = graph
        .edge_indices()
        .map(|edge| f64::from(graph[edge].weight))
        .sum();
    if m == 0.0 || !m.is_finite() {
        return group_membership(&membership);
    }

    // weighted degree per node; community totals follow the merges
    let mut tot: Vec<f64> = vec![0.0; n];
    for edge in graph.edge_indices() {
        if let Some((a, b)) = graph.edge_endpoints(edge) {
            let weight = f64::from(graph[edge].weight);
            tot[a.index()] += weight;
            tot[b.index()] += weight;
        }
    }

    loop {
        // inter-community edge weights under the current membership
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for edge in graph.edge_indices() {
            let Some((a, b)) = graph.edge_endpoints(edge) else {
                continue;
            };
            let (ca, cb) = (membership[a.index()], membership[b.index()]);
            if ca != cb {
                let key = (ca.min(cb), ca.max(cb));
                *between.entry(key).or_insert(0.0) += f64::from(graph[edge].weight);
            }
        }

        // best-gain merge; BTreeMap order makes ties deterministic
        let mut best: Option<((usize, usize), f64)> = None;
        for (&(ca, cb), &weight) in &between {
            let gain = weight / m - tot[ca] * tot[cb] / (2.0 * m * m);
            if best.map_or(true, |(_, best_gain)| gain > best_gain + 1e-12) {
                best = Some(((ca, cb), gain));
            }
        }
        let Some(((keep, absorb), gain)) = best else {
            break;
        };
        if gain <= 0.0 {
            break;
        }

        tot[keep] += tot[absorb];
        tot[absorb] = 0.0;
        for community in &mut membership {
            if *community == absorb {
                *community = keep;
            }
        }
    }

    group_membership(&membership)
}
