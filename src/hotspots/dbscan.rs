//! DBSCAN over event coordinates in degree space.
//!
//! Neighborhood queries go through an R*-tree, so clustering is
//! O(n log n) for realistic event densities. Labels are assigned by a
//! deterministic scan in input order: rerunning on the same events yields
//! identical cluster ids.

use rstar::{primitives::GeomWithData, RTree};

/// Noise label.
pub const NOISE: i32 = -1;

/// Cluster (lat, lon) points with DBSCAN using Euclidean distance in
/// degrees. Returns one label per input point: `NOISE` or a cluster id
/// assigned from 0 in discovery order.
pub fn cluster(points: &[(f64, f64)], eps_degrees: f64, min_samples: usize) -> Vec<i32> {
    if points.is_empty() {
        return Vec::new();
    }

    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| GeomWithData::new([lat, lon], i))
            .collect(),
    );
    let eps_sq = eps_degrees * eps_degrees;
    let neighbors_of = |i: usize| -> Vec<usize> {
        let (lat, lon) = points[i];
        let mut found: Vec<usize> = tree
            .locate_within_distance([lat, lon], eps_sq)
            .map(|n| n.data)
            .collect();
        found.sort_unstable();
        found
    };

    let mut labels: Vec<Option<i32>> = vec![None; points.len()];
    let mut next_cluster = 0;

    for i in 0..points.len() {
        if labels[i].is_some() {
            continue;
        }
        let neighbors = neighbors_of(i);
        if neighbors.len() < min_samples {
            labels[i] = Some(NOISE);
            continue;
        }

        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[i] = Some(cluster_id);

        // Expand the cluster breadth-first from the seed's neighborhood.
        let mut queue: std::collections::VecDeque<usize> = neighbors.into();
        while let Some(j) = queue.pop_front() {
            match labels[j] {
                Some(label) if label != NOISE => continue,
                Some(_) => {
                    // previously noise; it becomes a border point
                    labels[j] = Some(cluster_id);
                    continue;
                }
                None => {
                    labels[j] = Some(cluster_id);
                    let reachable = neighbors_of(j);
                    if reachable.len() >= min_samples {
                        queue.extend(reachable);
                    }
                }
            }
        }
    }

    labels.into_iter().map(|l| l.unwrap_or(NOISE)).collect()
}
