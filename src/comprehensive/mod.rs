//! Comprehensive Risk Evaluation Module (C7)
//!
//! Independent of the dark-event path: every pair of consecutive fixes of a
//! vessel becomes a trajectory segment, scored across all available signals
//! (AIS silence, speed anomalies, MPA containment, fishing activity,
//! distance covered while silent, nighttime operation, distance from
//! shore). Segments above the risk floor are emitted with a violation
//! classification; per-vessel profiles aggregate them.

mod detector;

pub use detector::{
    detect_suspicious_segments, vessel_risk_profiles, SuspiciousSegment, VesselRiskProfile,
    ViolationType,
};
