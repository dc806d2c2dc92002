//! Spatial Aggregation Module (C6)
//!
//! Two complementary views of where dark events concentrate:
//! - DBSCAN clusters over event midpoints, summarized with centroid, score
//!   statistics and the hotspot rule (>= 10 events and average score >= 0.6)
//! - fixed-cell grid binning for heatmap rendering
//!
//! Cluster ids are stamped back onto the scored events; noise stays -1.

mod dbscan;

pub use dbscan::NOISE;

use crate::config::PipelineConfig;
use crate::types::{Position, ScoredEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// A non-noise DBSCAN cluster of dark events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub cluster_id: i32,
    pub event_count: usize,
    pub center: Position,
    pub avg_suspicion_score: f64,
    pub unique_vessels: usize,
    /// Sorted distinct member MMSIs
    pub vessel_mmsis: Vec<u32>,
    pub is_hotspot: bool,
}

/// One occupied cell of the heatmap grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridCell {
    /// Southwest corner of the cell (floored to the grid)
    pub grid_lat: f64,
    pub grid_lon: f64,
    pub event_count: usize,
    pub unique_vessels: usize,
    pub total_score: f64,
    pub avg_score: f64,
}

/// Cluster scored events spatially. Returns the events with `cluster_id`
/// stamped and the non-noise cluster summaries sorted by
/// `(event_count desc, cluster_id)`.
pub fn cluster_events(
    events: Vec<ScoredEvent>,
    config: &PipelineConfig,
) -> (Vec<ScoredEvent>, Vec<Cluster>) {
    if events.is_empty() {
        return (events, Vec::new());
    }

    let points: Vec<(f64, f64)> = events
        .iter()
        .map(|e| (e.location().lat, e.location().lon))
        .collect();
    let labels = dbscan::cluster(
        &points,
        config.dbscan.eps_degrees(),
        config.dbscan.min_samples,
    );

    let mut events = events;
    for (event, &label) in events.iter_mut().zip(&labels) {
        event.cluster_id = label;
    }

    let mut members: BTreeMap<i32, Vec<&ScoredEvent>> = BTreeMap::new();
    for event in &events {
        if event.cluster_id != NOISE {
            members.entry(event.cluster_id).or_default().push(event);
        }
    }

    let mut clusters: Vec<Cluster> = members
        .into_iter()
        .map(|(cluster_id, group)| {
            let event_count = group.len();
            let center_lat =
                group.iter().map(|e| e.location().lat).sum::<f64>() / event_count as f64;
            let center_lon =
                group.iter().map(|e| e.location().lon).sum::<f64>() / event_count as f64;
            let avg_suspicion_score =
                group.iter().map(|e| e.total_score()).sum::<f64>() / event_count as f64;
            let vessel_mmsis: BTreeSet<u32> = group.iter().map(|e| e.mmsi()).collect();

            Cluster {
                cluster_id,
                event_count,
                center: Position::new(center_lat, center_lon),
                avg_suspicion_score,
                unique_vessels: vessel_mmsis.len(),
                vessel_mmsis: vessel_mmsis.into_iter().collect(),
                is_hotspot: event_count >= 10 && avg_suspicion_score >= 0.6,
            }
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });

    let hotspots = clusters.iter().filter(|c| c.is_hotspot).count();
    let noise = events.iter().filter(|e| e.cluster_id == NOISE).count();
    info!(
        clusters = clusters.len(),
        hotspots,
        noise,
        "dark zone clustering complete"
    );
    (events, clusters)
}

/// Aggregate events into fixed grid cells for heatmap rendering, sorted by
/// `(event_count desc, cell key)`.
pub fn grid_bins(events: &[ScoredEvent], config: &PipelineConfig) -> Vec<GridCell> {
    let size = config.grid.size_degrees;

    #[derive(Default)]
    struct CellAccumulator {
        count: usize,
        total_score: f64,
        vessels: BTreeSet<u32>,
    }

    let mut cells: BTreeMap<(i64, i64), CellAccumulator> = BTreeMap::new();
    for event in events {
        let location = event.location();
        #[allow(clippy::cast_possible_truncation)]
        let key = (
            (location.lat / size).floor() as i64,
            (location.lon / size).floor() as i64,
        );
        let cell = cells.entry(key).or_default();
        cell.count += 1;
        cell.total_score += event.total_score();
        cell.vessels.insert(event.mmsi());
    }

    let mut bins: Vec<GridCell> = cells
        .into_iter()
        .map(|((lat_key, lon_key), cell)| GridCell {
            grid_lat: lat_key as f64 * size,
            grid_lon: lon_key as f64 * size,
            event_count: cell.count,
            unique_vessels: cell.vessels.len(),
            total_score: cell.total_score,
            avg_score: cell.total_score / cell.count as f64,
        })
        .collect();
    bins.sort_by(|a, b| {
        b.event_count.cmp(&a.event_count).then_with(|| {
            (a.grid_lat, a.grid_lon)
                .partial_cmp(&(b.grid_lat, b.grid_lon))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    info!(cells = bins.len(), "grid aggregation complete");
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextualizedEvent, DarkEvent, Region, SuspicionScores};
    use chrono::{TimeZone, Utc};

    fn scored(mmsi: u32, lat: f64, lon: f64, total: f64) -> ScoredEvent {
        let location = Position::new(lat, lon);
        ScoredEvent {
            context: ContextualizedEvent {
                event: DarkEvent {
                    mmsi,
                    start: Utc.timestamp_opt(1_704_067_200, 0).single().expect("ts"),
                    end: Utc.timestamp_opt(1_704_070_800, 0).single().expect("ts"),
                    region: Region::classify(lat, lon),
                    location,
                    start_location: location,
                    end_location: location,
                    duration_hours: 1.0,
                    vessel_name: None,
                    vessel_type: None,
                    fishing_gear_types: Vec::new(),
                    is_fishing_vessel: false,
                },
                unique_nearby_vessels: 0,
                continuously_transmitting_nearby: 0,
                coverage_reliability: 0.0,
                confidence_score: 0.0,
                high_confidence: false,
            },
            scores: SuspicionScores { total_score: total, ..SuspicionScores::default() },
            is_highly_suspicious: total >= 0.7,
            cluster_id: -1,
        }
    }

    fn blob(count: usize, base_mmsi: u32, lat: f64, lon: f64, score: f64) -> Vec<ScoredEvent> {
        (0..count)
            .map(|i| {
                scored(
                    base_mmsi + i as u32,
                    lat + (i as f64) * 0.01,
                    lon,
                    score,
                )
            })
            .collect()
    }

    #[test]
    fn hotspot_rule_boundaries() {
        let config = PipelineConfig::default();

        // 10 events, avg exactly 0.6: hotspot
        let (_, clusters) = cluster_events(blob(10, 100, 0.0, 0.0, 0.6), &config);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_hotspot);

        // 9 events, avg 0.9: not a hotspot (too few events)
        let (_, clusters) = cluster_events(blob(9, 100, 0.0, 0.0, 0.9), &config);
        assert_eq!(clusters.len(), 1);
        assert!(!clusters[0].is_hotspot);

        // 10 events, avg 0.59: not a hotspot (score too low)
        let (_, clusters) = cluster_events(blob(10, 100, 0.0, 0.0, 0.59), &config);
        assert_eq!(clusters.len(), 1);
        assert!(!clusters[0].is_hotspot);
    }

    #[test]
    fn noise_events_keep_minus_one() {
        let config = PipelineConfig::default();
        let mut events = blob(5, 100, 0.0, 0.0, 0.5);
        events.push(scored(999, 60.0, 120.0, 0.5));

        let (stamped, clusters) = cluster_events(events, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(stamped.last().map(|e| e.cluster_id), Some(NOISE));
        // no event belongs to two clusters: members of cluster 0 all share id 0
        assert!(stamped[..5].iter().all(|e| e.cluster_id == 0));
    }

    #[test]
    fn cluster_summary_aggregates_members() {
        let config = PipelineConfig::default();
        let mut events = blob(4, 100, 10.0, 20.0, 0.4);
        // same vessel twice: unique vessel count collapses
        events.push(scored(100, 10.02, 20.0, 0.8));

        let (_, clusters) = cluster_events(events, &config);
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.event_count, 5);
        assert_eq!(cluster.unique_vessels, 4);
        assert_eq!(cluster.vessel_mmsis, vec![100, 101, 102, 103]);
        assert!((cluster.avg_suspicion_score - (0.4 * 4.0 + 0.8) / 5.0).abs() < 1e-9);
        assert!((cluster.center.lon - 20.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_propagates() {
        let config = PipelineConfig::default();
        let (events, clusters) = cluster_events(Vec::new(), &config);
        assert!(events.is_empty());
        assert!(clusters.is_empty());
        assert!(grid_bins(&[], &config).is_empty());
    }

    #[test]
    fn grid_keys_floor_toward_negative_infinity() {
        let config = PipelineConfig::default();
        let events = vec![
            scored(1, -0.5, -0.5, 0.4),
            scored(2, -0.6, -0.4, 0.6),
            scored(3, 0.5, 0.5, 0.2),
        ];
        let bins = grid_bins(&events, &config);
        assert_eq!(bins.len(), 2);
        // the two southern-hemisphere events share the (-1, -1) cell
        let southern = bins.iter().find(|b| b.event_count == 2).expect("cell");
        assert!((southern.grid_lat - -1.0).abs() < 1e-9);
        assert!((southern.grid_lon - -1.0).abs() < 1e-9);
        assert!((southern.avg_score - 0.5).abs() < 1e-9);
        let northern = bins.iter().find(|b| b.event_count == 1).expect("cell");
        assert!((northern.grid_lat - 0.0).abs() < 1e-9);
    }

    #[test]
    fn grid_sorted_by_count_descending() {
        let config = PipelineConfig::default();
        let mut events = blob(3, 100, 5.5, 5.5, 0.5);
        events.extend(blob(6, 200, 40.5, 40.5, 0.5));
        let bins = grid_bins(&events, &config);
        assert!(bins[0].event_count >= bins[1].event_count);
        assert_eq!(bins[0].event_count, 6);
    }
}
