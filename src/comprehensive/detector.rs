//! Per-segment risk scoring and vessel risk profiles.

use crate::config::PipelineConfig;
use crate::geo;
use crate::loader::{FixStore, MpaLookup};
use crate::types::{Fix, Position};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Violation classification, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    IllegalFishingInMpa,
    MpaIntrusion,
    FishingWithAisOff,
    SuspiciousAisSilence,
    SuspiciousFishingBehavior,
    GeneralSuspiciousActivity,
}

impl ViolationType {
    /// Precedence rank; lower is more severe.
    fn severity_rank(self) -> u8 {
        match self {
            ViolationType::IllegalFishingInMpa => 0,
            ViolationType::MpaIntrusion => 1,
            ViolationType::FishingWithAisOff => 2,
            ViolationType::SuspiciousAisSilence => 3,
            ViolationType::SuspiciousFishingBehavior => 4,
            ViolationType::GeneralSuspiciousActivity => 5,
        }
    }

    fn classify(in_mpa: bool, is_fishing: bool, has_dark: bool, has_speed_anomaly: bool) -> Self {
        if in_mpa && is_fishing {
            ViolationType::IllegalFishingInMpa
        } else if in_mpa {
            ViolationType::MpaIntrusion
        } else if has_dark && is_fishing {
            ViolationType::FishingWithAisOff
        } else if has_dark {
            ViolationType::SuspiciousAisSilence
        } else if has_speed_anomaly && is_fishing {
            ViolationType::SuspiciousFishingBehavior
        } else {
            ViolationType::GeneralSuspiciousActivity
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViolationType::IllegalFishingInMpa => "ILLEGAL_FISHING_IN_MPA",
            ViolationType::MpaIntrusion => "MPA_INTRUSION",
            ViolationType::FishingWithAisOff => "FISHING_WITH_AIS_OFF",
            ViolationType::SuspiciousAisSilence => "SUSPICIOUS_AIS_SILENCE",
            ViolationType::SuspiciousFishingBehavior => "SUSPICIOUS_FISHING_BEHAVIOR",
            ViolationType::GeneralSuspiciousActivity => "GENERAL_SUSPICIOUS_ACTIVITY",
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One trajectory segment whose combined risk cleared the floor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspiciousSegment {
    pub mmsi: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_location: Position,
    pub end_location: Position,
    pub vessel_type: Option<String>,
    pub gap_hours: f64,
    /// The gap when it qualified as a dark period, otherwise 0
    pub dark_period_hours: f64,
    pub dark_period_risk: f64,
    pub speed_anomaly_risk: f64,
    pub mpa_risk: f64,
    pub fishing_risk: f64,
    pub distance_risk: f64,
    pub nighttime_risk: f64,
    pub shore_distance_risk: f64,
    pub in_mpa: bool,
    pub fishing_detected: bool,
    pub nighttime_operation: bool,
    pub current_speed_knots: Option<f32>,
    pub total_risk: f64,
    pub violation_type: ViolationType,
}

/// Aggregated risk picture for one vessel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VesselRiskProfile {
    pub mmsi: u32,
    pub vessel_type: Option<String>,
    pub total_suspicious_events: usize,
    pub total_dark_hours: f64,
    pub avg_risk_score: f64,
    pub max_risk_score: f64,
    /// Segments with total risk above 0.7
    pub high_risk_events: usize,
    pub mpa_violations: usize,
    pub fishing_while_dark: usize,
    pub nighttime_operations: usize,
    pub last_violation_time: DateTime<Utc>,
    pub last_location: Position,
    pub primary_violation_type: ViolationType,
}

/// Evaluate every consecutive fix pair of every vessel and keep segments
/// whose total risk reaches `comprehensive.min_risk`.
pub fn detect_suspicious_segments<M>(
    store: &FixStore,
    config: &PipelineConfig,
    mpa: &M,
) -> Vec<SuspiciousSegment>
where
    M: MpaLookup + Sync,
{
    let vessels: Vec<(u32, &[Fix])> = store.vessels().collect();
    let segments: Vec<SuspiciousSegment> = vessels
        .par_iter()
        .flat_map_iter(|(_, fixes)| scan_vessel(fixes, config, mpa).into_iter())
        .collect();

    let high = segments.iter().filter(|s| s.total_risk > 0.7).count();
    info!(
        segments = segments.len(),
        high_risk = high,
        "comprehensive risk evaluation complete"
    );
    segments
}

fn scan_vessel<M>(fixes: &[Fix], config: &PipelineConfig, mpa: &M) -> Vec<SuspiciousSegment>
where
    M: MpaLookup + Sync,
{
    let c = &config.comprehensive;
    let w = &c.weights;
    let mut segments = Vec::new();

    for pair in fixes.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let gap_hours = (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / 3_600_000.0;
        if gap_hours <= 0.0 {
            continue;
        }

        // 1. AIS silence, normalized over 24 hours
        let dark_period_risk = if gap_hours >= c.dark_hours_threshold {
            (gap_hours / 24.0).min(1.0)
        } else {
            0.0
        };

        // 2. Speed anomalies: crawling, fleeing, or a sudden change
        let curr_speed = f64::from(curr.speed.unwrap_or(0.0));
        let prev_speed = f64::from(prev.speed.unwrap_or(0.0));
        let mut speed_anomaly_risk: f64 = 0.0;
        if curr_speed > 0.0 && curr_speed < c.speed_min {
            speed_anomaly_risk = 0.6;
        } else if curr_speed > c.speed_max {
            speed_anomaly_risk = 0.4;
        }
        if (curr_speed - prev_speed).abs() > 10.0 {
            speed_anomaly_risk = speed_anomaly_risk.max(0.5);
        }

        // 3. Marine protected area containment
        let in_mpa = mpa.in_mpa(f64::from(curr.lat), f64::from(curr.lon));
        let mpa_risk = if in_mpa { 0.8 } else { 0.0 };

        // 4. Fishing activity, escalated to maximum inside an MPA
        let fishing_detected = curr.is_fishing.is_fishing();
        let fishing_risk = if fishing_detected {
            if in_mpa {
                1.0
            } else {
                0.3
            }
        } else {
            0.0
        };

        // 5. Distance covered during the gap (fast while silent)
        let distance_km = geo::haversine_km(
            f64::from(prev.lat),
            f64::from(prev.lon),
            f64::from(curr.lat),
            f64::from(curr.lon),
        );
        let avg_kmh = distance_km / gap_hours;
        let distance_risk = if avg_kmh > 20.0 { (avg_kmh / 40.0).min(1.0) } else { 0.0 };

        // 6. Nighttime operation (20:00-05:00 UTC)
        let hour = curr.hour();
        let nighttime_operation = hour >= 20 || hour <= 5;
        let nighttime_risk = if nighttime_operation {
            if fishing_detected {
                0.5
            } else {
                0.2
            }
        } else {
            0.0
        };

        // 7. Far offshore
        let far_offshore = curr
            .distance_from_shore_m
            .is_some_and(|d| f64::from(d) > 100_000.0);
        let shore_distance_risk = if far_offshore { 0.3 } else { 0.0 };

        let total_risk = w.dark_period * dark_period_risk
            + w.mpa_violation * mpa_risk
            + w.fishing_activity * fishing_risk
            + w.speed_anomaly * speed_anomaly_risk
            + w.distance_traveled * distance_risk
            + w.nighttime * nighttime_risk
            + w.shore_distance * shore_distance_risk;

        if total_risk < c.min_risk {
            continue;
        }

        segments.push(SuspiciousSegment {
            mmsi: curr.mmsi,
            start_time: prev.timestamp,
            end_time: curr.timestamp,
            start_location: Position::from(prev),
            end_location: Position::from(curr),
            vessel_type: curr.vessel_type.clone().or_else(|| prev.vessel_type.clone()),
            gap_hours,
            dark_period_hours: if dark_period_risk > 0.0 { gap_hours } else { 0.0 },
            dark_period_risk,
            speed_anomaly_risk,
            mpa_risk,
            fishing_risk,
            distance_risk,
            nighttime_risk,
            shore_distance_risk,
            in_mpa,
            fishing_detected,
            nighttime_operation,
            current_speed_knots: curr.speed,
            total_risk,
            violation_type: ViolationType::classify(
                in_mpa,
                fishing_detected,
                dark_period_risk > 0.0,
                speed_anomaly_risk > 0.0,
            ),
        });
    }
    segments
}

/// Aggregate suspicious segments into per-vessel risk profiles, sorted by
/// average risk descending (ties by MMSI).
pub fn vessel_risk_profiles(segments: &[SuspiciousSegment]) -> Vec<VesselRiskProfile> {
    let mut by_vessel: HashMap<u32, Vec<&SuspiciousSegment>> = HashMap::new();
    for segment in segments {
        by_vessel.entry(segment.mmsi).or_default().push(segment);
    }

    let mut profiles: Vec<VesselRiskProfile> = by_vessel
        .into_iter()
        .map(|(mmsi, group)| {
            let total = group.len();
            let sum_risk: f64 = group.iter().map(|s| s.total_risk).sum();
            let max_risk = group.iter().map(|s| s.total_risk).fold(0.0_f64, f64::max);

            let last = group
                .iter()
                .max_by_key(|s| s.end_time)
                .copied()
                .unwrap_or(group[0]);

            // Mode over violation types; ties go to the more severe type.
            let mut counts: HashMap<ViolationType, usize> = HashMap::new();
            for segment in &group {
                *counts.entry(segment.violation_type).or_insert(0) += 1;
            }
            let primary_violation_type = counts
                .into_iter()
                .min_by_key(|(vtype, count)| (std::cmp::Reverse(*count), vtype.severity_rank()))
                .map_or(ViolationType::GeneralSuspiciousActivity, |(vtype, _)| vtype);

            VesselRiskProfile {
                mmsi,
                vessel_type: last.vessel_type.clone(),
                total_suspicious_events: total,
                total_dark_hours: group.iter().map(|s| s.dark_period_hours).sum(),
                avg_risk_score: sum_risk / total as f64,
                max_risk_score: max_risk,
                high_risk_events: group.iter().filter(|s| s.total_risk > 0.7).count(),
                mpa_violations: group.iter().filter(|s| s.in_mpa).count(),
                fishing_while_dark: group
                    .iter()
                    .filter(|s| s.dark_period_hours > 0.0 && s.fishing_detected)
                    .count(),
                nighttime_operations: group.iter().filter(|s| s.nighttime_operation).count(),
                last_violation_time: last.end_time,
                last_location: last.end_location,
                primary_violation_type,
            }
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.avg_risk_score
            .partial_cmp(&a.avg_risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.mmsi.cmp(&b.mmsi))
    });

    info!(vessels = profiles.len(), "vessel risk profiles built");
    profiles
}
