//! Graph construction from scored events and the fix stream.

use super::{EdgeLog, EncounterRecord, VesselGraph, VesselNode};
use crate::config::PipelineConfig;
use crate::geo;
use crate::loader::FixStore;
use crate::types::{FleetRegistry, ScoredEvent};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Build the coordination graph.
///
/// One node per vessel with a scored event (attributes aggregated over its
/// events), plus nodes for vessels discovered nearby. An edge connects an
/// event's vessel to every vessel that had at least one fix inside the
/// event's [start, end] window within `network.proximity_threshold_km` of
/// the event midpoint; its weight counts such events.
///
/// The fix stream is consulted directly rather than the proximity index:
/// the event window and distance threshold are distinct parameters from the
/// index's bin width and pair radius.
pub fn build_vessel_graph(
    events: &[ScoredEvent],
    store: &FixStore,
    fleet: &FleetRegistry,
    config: &PipelineConfig,
) -> VesselGraph {
    let mut graph = VesselGraph::default();
    let mut node_of: HashMap<u32, NodeIndex> = HashMap::new();

    // Aggregate per-vessel event statistics first so node attributes are
    // complete before any edges reference them. BTreeMap keeps node
    // insertion in ascending MMSI order for reproducible indices.
    #[derive(Default)]
    struct VesselAccumulator {
        event_count: usize,
        total_risk: f64,
        vessel_type: Option<String>,
        is_fishing: bool,
    }
    let mut accumulators: BTreeMap<u32, VesselAccumulator> = BTreeMap::new();
    for event in events {
        let acc = accumulators.entry(event.mmsi()).or_default();
        acc.event_count += 1;
        acc.total_risk += event.total_score();
        if acc.vessel_type.is_none() {
            acc.vessel_type = event.context.event.vessel_type.clone();
        }
        acc.is_fishing |= event.context.event.is_fishing_vessel;
    }
    for (mmsi, acc) in accumulators {
        let node = graph.add_node(VesselNode {
            mmsi,
            vessel_type: acc.vessel_type,
            event_count: acc.event_count,
            total_risk: acc.total_risk,
            avg_risk: acc.total_risk / acc.event_count.max(1) as f64,
            is_fishing: acc.is_fishing,
        });
        node_of.insert(mmsi, node);
    }

    let threshold_km = config.network.proximity_threshold_km;
    for event in events {
        let Some(&event_node) = node_of.get(&event.mmsi()) else {
            continue;
        };
        let location = event.location();
        let (start, end) = (event.context.event.start, event.context.event.end);

        for (other_mmsi, fixes) in store.vessels() {
            if other_mmsi == event.mmsi() {
                continue;
            }
            // Narrow to the event window by binary search, then look for a
            // single fix inside the proximity threshold.
            let lo = fixes.partition_point(|f| f.timestamp < start);
            let hi = fixes.partition_point(|f| f.timestamp <= end);
            let in_window = &fixes[lo..hi];
            let was_nearby = in_window.iter().any(|f| {
                geo::haversine_km(location.lat, location.lon, f64::from(f.lat), f64::from(f.lon))
                    <= threshold_km
            });
            if !was_nearby {
                continue;
            }

            let other_node = *node_of.entry(other_mmsi).or_insert_with(|| {
                graph.add_node(VesselNode {
                    mmsi: other_mmsi,
                    vessel_type: in_window
                        .first()
                        .or_else(|| fixes.first())
                        .and_then(|f| f.vessel_type.clone()),
                    event_count: 0,
                    total_risk: 0.0,
                    avg_risk: 0.0,
                    is_fishing: fleet.is_fishing_vessel(other_mmsi),
                })
            });

            let record = EncounterRecord { timestamp: start, location };
            if let Some(edge) = graph.find_edge(event_node, other_node) {
                if let Some(log) = graph.edge_weight_mut(edge) {
                    log.weight += 1;
                    log.encounters.push(record);
                }
            } else {
                graph.add_edge(
                    event_node,
                    other_node,
                    EdgeLog { weight: 1, encounters: vec![record] },
                );
            }
        }
    }

    info!(
        vessels = graph.node_count(),
        connections = graph.edge_count(),
        "vessel coordination network built"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ContextualizedEvent, DarkEvent, FishingStatus, Fix, Position, Region, SuspicionScores,
    };
    use chrono::{TimeZone, Utc};

    fn fix(mmsi: u32, secs: i64, lat: f32, lon: f32) -> Fix {
        Fix {
            mmsi,
            timestamp: Utc.timestamp_opt(1_704_067_200 + secs, 0).single().expect("ts"),
            lat,
            lon,
            speed: None,
            course: None,
            vessel_name: None,
            vessel_type: None,
            is_fishing: FishingStatus::Unknown,
            distance_from_shore_m: None,
        }
    }

    fn scored(mmsi: u32, start_secs: i64, end_secs: i64, total: f64) -> ScoredEvent {
        let location = Position::new(10.0, 20.0);
        ScoredEvent {
            context: ContextualizedEvent {
                event: DarkEvent {
                    mmsi,
                    start: Utc.timestamp_opt(1_704_067_200 + start_secs, 0).single().expect("ts"),
                    end: Utc.timestamp_opt(1_704_067_200 + end_secs, 0).single().expect("ts"),
                    region: Region::classify(location.lat, location.lon),
                    location,
                    start_location: location,
                    end_location: location,
                    duration_hours: (end_secs - start_secs) as f64 / 3600.0,
                    vessel_name: None,
                    vessel_type: None,
                    fishing_gear_types: Vec::new(),
                    is_fishing_vessel: true,
                },
                unique_nearby_vessels: 0,
                continuously_transmitting_nearby: 0,
                coverage_reliability: 0.0,
                confidence_score: 0.0,
                high_confidence: false,
            },
            scores: SuspicionScores { total_score: total, ..SuspicionScores::default() },
            is_highly_suspicious: false,
            cluster_id: -1,
        }
    }

    #[test]
    fn nearby_vessel_during_event_creates_weighted_edge() {
        let events = vec![scored(1, 0, 3600, 0.5), scored(1, 7200, 10_800, 0.7)];
        // vessel 2 is ~5.5 km from the midpoint during both windows
        let store = FixStore::from_fixes(vec![
            fix(1, 0, 10.0, 20.0),
            fix(2, 1800, 10.05, 20.0),
            fix(2, 9000, 10.05, 20.0),
        ]);
        let graph = build_vessel_graph(
            &events,
            &store,
            &FleetRegistry::new(),
            &PipelineConfig::default(),
        );

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge_indices().next().expect("edge");
        let log = &graph[edge];
        assert_eq!(log.weight, 2, "both events co-occurred");
        assert_eq!(log.encounters.len(), 2);

        // the event vessel carries aggregated risk; the neighbor is zeroed
        let nodes: Vec<&VesselNode> = graph.node_weights().collect();
        let event_vessel = nodes.iter().find(|n| n.mmsi == 1).expect("node 1");
        assert_eq!(event_vessel.event_count, 2);
        assert!((event_vessel.total_risk - 1.2).abs() < 1e-9);
        assert!((event_vessel.avg_risk - 0.6).abs() < 1e-9);
        let neighbor = nodes.iter().find(|n| n.mmsi == 2).expect("node 2");
        assert_eq!(neighbor.event_count, 0);
    }

    #[test]
    fn distant_or_out_of_window_vessels_are_excluded() {
        let events = vec![scored(1, 0, 3600, 0.5)];
        let store = FixStore::from_fixes(vec![
            fix(1, 0, 10.0, 20.0),
            fix(2, 1800, 12.0, 20.0),  // ~222 km away
            fix(3, 7200, 10.05, 20.0), // close but after the window
        ]);
        let graph = build_vessel_graph(
            &events,
            &store,
            &FleetRegistry::new(),
            &PipelineConfig::default(),
        );
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn no_self_loops() {
        let events = vec![scored(1, 0, 3600, 0.5)];
        // the event vessel itself has fixes inside the window
        let store = FixStore::from_fixes(vec![fix(1, 0, 10.0, 20.0), fix(1, 1800, 10.0, 20.0)]);
        let graph = build_vessel_graph(
            &events,
            &store,
            &FleetRegistry::new(),
            &PipelineConfig::default(),
        );
        assert_eq!(graph.edge_count(), 0);
        for edge in graph.edge_indices() {
            let (a, b) = graph.edge_endpoints(edge).expect("endpoints");
            assert_ne!(a, b);
        }
    }

    #[test]
    fn nearby_vessel_inherits_fleet_flag() {
        let events = vec![scored(1, 0, 3600, 0.5)];
        let store = FixStore::from_fixes(vec![
            fix(1, 0, 10.0, 20.0),
            fix(2, 1800, 10.05, 20.0),
        ]);
        let mut fleet = FleetRegistry::new();
        fleet.insert(2, crate::types::GearType::Trawlers);

        let graph =
            build_vessel_graph(&events, &store, &fleet, &PipelineConfig::default());
        let neighbor = graph
            .node_weights()
            .find(|n| n.mmsi == 2)
            .expect("neighbor node");
        assert!(neighbor.is_fishing);
    }

    #[test]
    fn empty_events_build_empty_graph() {
        let store = FixStore::from_fixes(vec![fix(1, 0, 10.0, 20.0)]);
        let graph = build_vessel_graph(
            &[],
            &store,
            &FleetRegistry::new(),
            &PipelineConfig::default(),
        );
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }
}
