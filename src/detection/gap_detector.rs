//! Per-vessel transmission gap scan.

use crate::cancel::CancelFlag;
use crate::config::PipelineConfig;
use crate::loader::FixStore;
use crate::types::{DarkEvent, FleetRegistry, Fix, Position, Region};
use rayon::prelude::*;
use tracing::info;

/// Scan every vessel's time-ordered fixes and emit a [`DarkEvent`] for each
/// gap strictly exceeding `detection.threshold_minutes`.
///
/// A vessel with fewer than two fixes produces nothing. A gap of exactly the
/// threshold produces nothing. Cancellation is honored per vessel; already
/// scanned vessels keep their events.
pub fn detect_dark_events(
    store: &FixStore,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Vec<DarkEvent> {
    let threshold_secs = config.detection.threshold_minutes * 60.0;
    let vessels: Vec<(u32, &[Fix])> = store.vessels().collect();

    let events: Vec<DarkEvent> = vessels
        .par_iter()
        .flat_map_iter(|(_, fixes)| {
            if cancel.is_cancelled() {
                return Vec::new().into_iter();
            }
            scan_vessel(fixes, threshold_secs).into_iter()
        })
        .collect();

    info!(
        events = events.len(),
        vessels = store.vessel_count(),
        threshold_minutes = config.detection.threshold_minutes,
        "dark event detection complete"
    );
    events
}

/// Scan one vessel's time-ordered fixes for gaps.
fn scan_vessel(fixes: &[Fix], threshold_secs: f64) -> Vec<DarkEvent> {
    let mut events = Vec::new();
    for pair in fixes.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let gap_secs = (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if gap_secs <= threshold_secs {
            continue;
        }

        let start_location = Position::from(prev);
        let end_location = Position::from(curr);
        let location = Position::midpoint(start_location, end_location);

        events.push(DarkEvent {
            mmsi: curr.mmsi,
            start: prev.timestamp,
            end: curr.timestamp,
            region: Region::classify(location.lat, location.lon),
            location,
            start_location,
            end_location,
            duration_hours: gap_secs / 3600.0,
            vessel_name: curr.vessel_name.clone().or_else(|| prev.vessel_name.clone()),
            vessel_type: curr.vessel_type.clone().or_else(|| prev.vessel_type.clone()),
            fishing_gear_types: Vec::new(),
            is_fishing_vessel: false,
        });
    }
    events
}

/// Enrich detected events with fleet membership: attach the vessel's gear
/// categories and flag it as a fishing vessel when any are registered.
pub fn attach_fleet(events: Vec<DarkEvent>, fleet: &FleetRegistry) -> Vec<DarkEvent> {
    let mut enriched = events;
    let mut fishing = 0usize;
    for event in &mut enriched {
        if let Some(gear) = fleet.gear_for(event.mmsi) {
            event.fishing_gear_types = gear.iter().copied().collect();
            event.is_fishing_vessel = true;
            fishing += 1;
        }
    }
    info!(
        total = enriched.len(),
        fishing_vessel_events = fishing,
        "fleet enrichment complete"
    );
    enriched
}
