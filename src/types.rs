//! Shared data structures for the AIS dark-event analysis pipeline
//!
//! This module defines the core record model threaded through the stages:
//! - C1: Fix (normalized AIS position report), FleetRegistry (gear reference data)
//! - C2: DarkEvent (transmission gap with region tag)
//! - C3: ProximityEncounter (vessel pair within distance threshold in a time bin)
//! - C4: ContextualizedEvent (dark event + nearby-vessel evidence)
//! - C5: ScoredEvent (contextualized event + weighted suspicion scores)
//!
//! Each stage produces a new record extending the prior one; nothing is
//! mutated in place after its producing stage finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// C1: Normalized AIS Records
// ============================================================================

/// Tri-state fishing activity flag carried by some AIS-derived datasets.
///
/// Global Fishing Watch tracks encode this as a float column where NaN means
/// unlabeled; NOAA AIS has no such column at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FishingStatus {
    Fishing,
    NotFishing,
    #[default]
    Unknown,
}

impl FishingStatus {
    /// True only when the record is positively labeled as fishing.
    pub fn is_fishing(self) -> bool {
        matches!(self, FishingStatus::Fishing)
    }
}

/// A single normalized AIS position report. Immutable after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fix {
    /// Maritime Mobile Service Identity (9-digit vessel ID)
    pub mmsi: u32,
    pub timestamp: DateTime<Utc>,
    /// WGS-84 decimal degrees, -90..=90
    pub lat: f32,
    /// WGS-84 decimal degrees, -180..=180
    pub lon: f32,
    /// Speed over ground, knots
    pub speed: Option<f32>,
    /// Course over ground, degrees 0-360
    pub course: Option<f32>,
    pub vessel_name: Option<String>,
    pub vessel_type: Option<String>,
    #[serde(default)]
    pub is_fishing: FishingStatus,
    /// Meters from the nearest shoreline, when the source provides it
    pub distance_from_shore_m: Option<f32>,
}

impl Fix {
    /// Hour-of-day (UTC) of the report, for nighttime checks.
    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.timestamp.hour()
    }
}

/// A (lat, lon) pair in decimal degrees. Event locations and centroids are
/// computed in f64 even though raw fixes store f32.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Arithmetic midpoint of two positions. Deliberately not a great-circle
    /// midpoint: dark-event locations are coarse and this is cheap.
    pub fn midpoint(a: Position, b: Position) -> Position {
        Position::new((a.lat + b.lat) / 2.0, (a.lon + b.lon) / 2.0)
    }
}

impl From<&Fix> for Position {
    fn from(fix: &Fix) -> Self {
        Position::new(f64::from(fix.lat), f64::from(fix.lon))
    }
}

// ============================================================================
// Fleet Reference Data
// ============================================================================

/// Fishing gear categories from the Global Fishing Watch fleet datasets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GearType {
    DriftingLonglines,
    FixedGear,
    PoleAndLine,
    PurseSeines,
    Trawlers,
    Trollers,
}

impl GearType {
    /// All known gear categories, in dataset order.
    pub const ALL: [GearType; 6] = [
        GearType::DriftingLonglines,
        GearType::FixedGear,
        GearType::PoleAndLine,
        GearType::PurseSeines,
        GearType::Trawlers,
        GearType::Trollers,
    ];

    /// Dataset file stem for this gear category (`<stem>.csv`).
    pub fn file_stem(self) -> &'static str {
        match self {
            GearType::DriftingLonglines => "drifting_longlines",
            GearType::FixedGear => "fixed_gear",
            GearType::PoleAndLine => "pole_and_line",
            GearType::PurseSeines => "purse_seines",
            GearType::Trawlers => "trawlers",
            GearType::Trollers => "trollers",
        }
    }
}

impl std::fmt::Display for GearType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

/// Mapping from MMSI to fishing gear categories. A vessel may carry several.
/// Loaded once at startup and read-only thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetRegistry {
    gear_by_mmsi: BTreeMap<u32, BTreeSet<GearType>>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mmsi: u32, gear: GearType) {
        self.gear_by_mmsi.entry(mmsi).or_default().insert(gear);
    }

    /// Gear categories registered for a vessel, if any.
    pub fn gear_for(&self, mmsi: u32) -> Option<&BTreeSet<GearType>> {
        self.gear_by_mmsi.get(&mmsi)
    }

    /// A vessel is a fishing vessel when it appears in any gear dataset.
    pub fn is_fishing_vessel(&self, mmsi: u32) -> bool {
        self.gear_by_mmsi.contains_key(&mmsi)
    }

    pub fn vessel_count(&self) -> usize {
        self.gear_by_mmsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gear_by_mmsi.is_empty()
    }
}

// ============================================================================
// Region Classification
// ============================================================================

/// Coarse ocean region tag assigned to each dark event from its midpoint.
///
/// This is deliberately a latitude/longitude rule cascade, not EEZ polygon
/// geodesy. Rules are checked in order; the first match wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Region {
    #[serde(rename = "Southern Ocean")]
    SouthernOcean,
    #[serde(rename = "Northern Pacific/Atlantic")]
    NorthernPacificAtlantic,
    #[serde(rename = "Eastern Pacific")]
    EasternPacific,
    #[serde(rename = "Atlantic")]
    Atlantic,
    #[serde(rename = "Indo-Pacific")]
    IndoPacific,
    #[serde(rename = "High Latitude Zone")]
    HighLatitude,
    #[serde(rename = "Open Ocean")]
    OpenOcean,
}

impl Region {
    /// Classify a midpoint into a region tag.
    ///
    /// Cascade order matters: lat 30 belongs to Northern Pacific/Atlantic
    /// (its band is checked before the tropics), and the high-latitude rule
    /// only applies when no band matched.
    pub fn classify(lat: f64, lon: f64) -> Region {
        if (-90.0..=-30.0).contains(&lat) {
            return Region::SouthernOcean;
        }
        if (30.0..=70.0).contains(&lat) {
            return Region::NorthernPacificAtlantic;
        }
        if (-30.0..=30.0).contains(&lat) {
            if (-180.0..=-80.0).contains(&lon) {
                return Region::EasternPacific;
            }
            if (-80.0..=20.0).contains(&lon) {
                return Region::Atlantic;
            }
            if (20.0..=180.0).contains(&lon) {
                return Region::IndoPacific;
            }
        }
        if lat.abs() > 60.0 {
            return Region::HighLatitude;
        }
        Region::OpenOcean
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::SouthernOcean => "Southern Ocean",
            Region::NorthernPacificAtlantic => "Northern Pacific/Atlantic",
            Region::EasternPacific => "Eastern Pacific",
            Region::Atlantic => "Atlantic",
            Region::IndoPacific => "Indo-Pacific",
            Region::HighLatitude => "High Latitude Zone",
            Region::OpenOcean => "Open Ocean",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// C2: Dark Events
// ============================================================================

/// A gap in a vessel's AIS transmissions exceeding the detection threshold.
///
/// Invariants: `end > start`, `duration_hours > threshold_hours`. The
/// bracketing fixes supply the start/end locations; `location` is their
/// arithmetic midpoint. Fleet enrichment fills `fishing_gear_types` and
/// `is_fishing_vessel` as a separate post-step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DarkEvent {
    pub mmsi: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub region: Region,
    /// Midpoint of the bracketing fixes; the event's nominal location
    pub location: Position,
    pub start_location: Position,
    pub end_location: Position,
    pub duration_hours: f64,
    pub vessel_name: Option<String>,
    pub vessel_type: Option<String>,
    #[serde(default)]
    pub fishing_gear_types: Vec<GearType>,
    #[serde(default)]
    pub is_fishing_vessel: bool,
}

// ============================================================================
// C3: Proximity Encounters
// ============================================================================

/// Two vessels observed within the distance threshold inside one time bin.
///
/// Invariants: `vessel1_mmsi < vessel2_mmsi` (canonical ordering, so a pair
/// is never emitted twice per bin), `distance_km <= threshold`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProximityEncounter {
    /// Bin start instant (timestamp floored to the bin width)
    pub time_bin: DateTime<Utc>,
    pub vessel1_mmsi: u32,
    pub vessel2_mmsi: u32,
    pub vessel1_location: Position,
    pub vessel2_location: Position,
    pub distance_km: f64,
}

impl ProximityEncounter {
    /// Build an encounter with canonical MMSI ordering, swapping the
    /// locations alongside the IDs when needed.
    pub fn canonical(
        time_bin: DateTime<Utc>,
        mmsi_a: u32,
        loc_a: Position,
        mmsi_b: u32,
        loc_b: Position,
        distance_km: f64,
    ) -> Self {
        if mmsi_a <= mmsi_b {
            Self {
                time_bin,
                vessel1_mmsi: mmsi_a,
                vessel2_mmsi: mmsi_b,
                vessel1_location: loc_a,
                vessel2_location: loc_b,
                distance_km,
            }
        } else {
            Self {
                time_bin,
                vessel1_mmsi: mmsi_b,
                vessel2_mmsi: mmsi_a,
                vessel1_location: loc_b,
                vessel2_location: loc_a,
                distance_km,
            }
        }
    }

    /// True when this encounter involves the given vessel.
    pub fn involves(&self, mmsi: u32) -> bool {
        self.vessel1_mmsi == mmsi || self.vessel2_mmsi == mmsi
    }
}

// ============================================================================
// C4: Contextualized Events
// ============================================================================

/// A dark event enriched with nearby-vessel evidence.
///
/// `coverage_reliability` estimates how well the area was covered by other
/// transmitters during the gap: if nearby vessels kept transmitting while
/// this one went dark, the silence was a choice, not a coverage hole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextualizedEvent {
    #[serde(flatten)]
    pub event: DarkEvent,
    /// Distinct other vessels seen near the event around its start/end
    pub unique_nearby_vessels: usize,
    /// Nearby vessels with at least one fix strictly inside the gap
    pub continuously_transmitting_nearby: usize,
    pub coverage_reliability: f64,
    pub confidence_score: f64,
    pub high_confidence: bool,
}

// ============================================================================
// C5: Scored Events
// ============================================================================

/// Weighted suspicion sub-scores. Each sub-score is already multiplied by
/// its configured weight, so `total_score` is their plain sum and lies in
/// [0, 1] when the weights sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SuspicionScores {
    pub duration_score: f64,
    pub coverage_score: f64,
    pub eez_score: f64,
    pub fishing_score: f64,
    pub repeat_score: f64,
    pub total_score: f64,
}

/// A fully scored dark event. `cluster_id` is stamped by the spatial
/// aggregator (-1 = noise / not clustered).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub context: ContextualizedEvent,
    #[serde(flatten)]
    pub scores: SuspicionScores,
    pub is_highly_suspicious: bool,
    pub cluster_id: i32,
}

impl ScoredEvent {
    pub fn mmsi(&self) -> u32 {
        self.context.event.mmsi
    }

    pub fn location(&self) -> Position {
        self.context.event.location
    }

    pub fn total_score(&self) -> f64 {
        self.scores.total_score
    }
}
