//! Pipeline configuration - all analysis thresholds as operator-tunable TOML values
//!
//! Each struct implements `Default` with values matching the documented
//! pipeline constants, so behavior is unchanged when no config file is
//! present. Section names mirror the pipeline stages.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a pipeline run.
///
/// Load with [`PipelineConfig::load`], validate once, then pass `&self`
/// into every stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dark-event gap detection (C2)
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Proximity index construction (C3)
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Dark-event context enrichment (C4)
    #[serde(default)]
    pub context: ContextConfig,

    /// Multi-factor suspicion scoring (C5)
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// DBSCAN hotspot clustering (C6)
    #[serde(default)]
    pub dbscan: DbscanConfig,

    /// Grid heatmap binning (C6)
    #[serde(default)]
    pub grid: GridConfig,

    /// Vessel coordination network (C8)
    #[serde(default)]
    pub network: NetworkConfig,

    /// Comprehensive per-segment risk evaluation (C7)
    #[serde(default)]
    pub comprehensive: ComprehensiveConfig,
}

impl PipelineConfig {
    /// Load configuration from the standard search path.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("FISHNET_CONFIG") {
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new("fishnet.toml");
        if local.exists() {
            return Self::from_file(local);
        }
        info!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and parse a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Validate configuration invariants. Fatal at startup on violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    key,
                    message: format!("must be positive and finite, got {value}"),
                })
            }
        }

        fn unit_range(key: &'static str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    key,
                    message: format!("must lie in [0, 1], got {value}"),
                })
            }
        }

        positive("detection.threshold_minutes", self.detection.threshold_minutes)?;

        if self.proximity.time_window_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "proximity.time_window_minutes",
                message: format!(
                    "must be positive, got {}",
                    self.proximity.time_window_minutes
                ),
            });
        }
        positive(
            "proximity.distance_threshold_km",
            self.proximity.distance_threshold_km,
        )?;
        if self.proximity.max_points_per_bin < 2 {
            return Err(ConfigError::Invalid {
                key: "proximity.max_points_per_bin",
                message: format!(
                    "a bin needs at least 2 points to form a pair, got {}",
                    self.proximity.max_points_per_bin
                ),
            });
        }
        if self.proximity.save_every == 0 {
            return Err(ConfigError::Invalid {
                key: "proximity.save_every",
                message: "must be at least 1".to_string(),
            });
        }

        positive("context.radius_km", self.context.radius_km)?;
        if self.context.window_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "context.window_minutes",
                message: format!("must be positive, got {}", self.context.window_minutes),
            });
        }

        let w = &self.scoring.weights;
        unit_range("scoring.weights.duration", w.duration)?;
        unit_range("scoring.weights.coverage", w.coverage)?;
        unit_range("scoring.weights.eez", w.eez)?;
        unit_range("scoring.weights.fishing", w.fishing)?;
        unit_range("scoring.weights.repeat", w.repeat)?;
        let sum = w.duration + w.coverage + w.eez + w.fishing + w.repeat;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid {
                key: "scoring.weights",
                message: format!("weights must sum to 1.0, got {sum}"),
            });
        }
        unit_range(
            "scoring.highly_suspicious_threshold",
            self.scoring.highly_suspicious_threshold,
        )?;

        positive("dbscan.eps_km", self.dbscan.eps_km)?;
        if self.dbscan.min_samples == 0 {
            return Err(ConfigError::Invalid {
                key: "dbscan.min_samples",
                message: "must be at least 1".to_string(),
            });
        }
        positive("grid.size_degrees", self.grid.size_degrees)?;
        positive("network.proximity_threshold_km", self.network.proximity_threshold_km)?;

        let c = &self.comprehensive;
        positive("comprehensive.dark_hours_threshold", c.dark_hours_threshold)?;
        if !(c.speed_min >= 0.0 && c.speed_max > c.speed_min) {
            return Err(ConfigError::Invalid {
                key: "comprehensive.speed_min/speed_max",
                message: format!(
                    "need 0 <= speed_min < speed_max, got {} / {}",
                    c.speed_min, c.speed_max
                ),
            });
        }
        unit_range("comprehensive.min_risk", c.min_risk)?;
        let cw = &c.weights;
        unit_range("comprehensive.weights.dark_period", cw.dark_period)?;
        unit_range("comprehensive.weights.mpa_violation", cw.mpa_violation)?;
        unit_range("comprehensive.weights.fishing_activity", cw.fishing_activity)?;
        unit_range("comprehensive.weights.speed_anomaly", cw.speed_anomaly)?;
        unit_range("comprehensive.weights.distance_traveled", cw.distance_traveled)?;
        unit_range("comprehensive.weights.nighttime", cw.nighttime)?;
        unit_range("comprehensive.weights.shore_distance", cw.shore_distance)?;
        let csum = cw.dark_period
            + cw.mpa_violation
            + cw.fishing_activity
            + cw.speed_anomaly
            + cw.distance_traveled
            + cw.nighttime
            + cw.shore_distance;
        if (csum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid {
                key: "comprehensive.weights",
                message: format!("weights must sum to 1.0, got {csum}"),
            });
        }

        Ok(())
    }
}

// ============================================================================
// [detection]
// ============================================================================

/// Gap detection (C2). 10 minutes suits exploratory runs on dense coastal
/// AIS; comprehensive mode uses its own 3-hour cutoff (see
/// [`ComprehensiveConfig::dark_hours_threshold`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Transmission gap above which a dark event is emitted (strict)
    pub threshold_minutes: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold_minutes: 10.0 }
    }
}

// ============================================================================
// [proximity]
// ============================================================================

/// Proximity index construction (C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Width of a time bin in minutes
    pub time_window_minutes: i64,
    /// Maximum pair distance in kilometers
    pub distance_threshold_km: f64,
    /// Dense bins are subsampled down to this many points
    pub max_points_per_bin: usize,
    /// Checkpoint cadence, in processed bins
    pub save_every: usize,
    /// Progress log cadence, in bins
    pub progress_every: usize,
    /// Seed for the deterministic bin subsample
    pub sample_seed: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            time_window_minutes: 10,
            distance_threshold_km: 20.0,
            max_points_per_bin: 5000,
            save_every: 25,
            progress_every: 10,
            sample_seed: 42,
        }
    }
}

// ============================================================================
// [context]
// ============================================================================

/// Context enrichment (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Radius around the event midpoint for nearby-vessel evidence
    pub radius_km: f64,
    /// Time slack around event start/end when matching encounter bins
    pub window_minutes: i64,
    /// Seed for the synthetic (fast-mode) context variant
    pub synthetic_seed: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            radius_km: 20.0,
            window_minutes: 15,
            synthetic_seed: 42,
        }
    }
}

// ============================================================================
// [scoring]
// ============================================================================

/// Multi-factor scoring weights (C5). Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub duration: f64,
    pub coverage: f64,
    pub eez: f64,
    pub fishing: f64,
    pub repeat: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            duration: 0.30,
            coverage: 0.20,
            eez: 0.20,
            fishing: 0.20,
            repeat: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Events at or above this total score are flagged highly suspicious
    pub highly_suspicious_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            highly_suspicious_threshold: 0.7,
        }
    }
}

// ============================================================================
// [dbscan]
// ============================================================================

/// Spatial clustering (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbscanConfig {
    /// Neighborhood radius in kilometers (converted to degrees at ~111 km/deg)
    pub eps_km: f64,
    /// Minimum neighborhood size for a core point
    pub min_samples: usize,
}

impl DbscanConfig {
    /// Neighborhood radius in degrees.
    pub fn eps_degrees(&self) -> f64 {
        self.eps_km / 111.0
    }
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self { eps_km: 50.0, min_samples: 3 }
    }
}

// ============================================================================
// [grid]
// ============================================================================

/// Heatmap grid binning (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length in degrees
    pub size_degrees: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { size_degrees: 1.0 }
    }
}

// ============================================================================
// [network]
// ============================================================================

/// Coordination network construction (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Co-occurrence distance from the event midpoint
    pub proximity_threshold_km: f64,
    /// Seed for Louvain community detection
    pub louvain_seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_km: 50.0,
            louvain_seed: 42,
        }
    }
}

// ============================================================================
// [comprehensive]
// ============================================================================

/// Per-segment risk weights (C7). Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComprehensiveWeights {
    pub dark_period: f64,
    pub mpa_violation: f64,
    pub fishing_activity: f64,
    pub speed_anomaly: f64,
    pub distance_traveled: f64,
    pub nighttime: f64,
    pub shore_distance: f64,
}

impl Default for ComprehensiveWeights {
    fn default() -> Self {
        Self {
            dark_period: 0.25,
            mpa_violation: 0.30,
            fishing_activity: 0.20,
            speed_anomaly: 0.10,
            distance_traveled: 0.08,
            nighttime: 0.04,
            shore_distance: 0.03,
        }
    }
}

/// Comprehensive per-segment risk evaluation (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComprehensiveConfig {
    /// Gaps at or above this many hours count as dark periods
    pub dark_hours_threshold: f64,
    /// Below this speed (knots, and above zero) a vessel is suspiciously slow
    pub speed_min: f64,
    /// Above this speed (knots) a vessel is suspiciously fast
    pub speed_max: f64,
    /// Segments below this total risk are not emitted
    pub min_risk: f64,
    #[serde(default)]
    pub weights: ComprehensiveWeights,
}

impl Default for ComprehensiveConfig {
    fn default() -> Self {
        Self {
            dark_hours_threshold: 3.0,
            speed_min: 2.0,
            speed_max: 15.0,
            min_risk: 0.3,
            weights: ComprehensiveWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn negative_threshold_is_fatal() {
        let mut config = PipelineConfig::default();
        config.detection.threshold_minutes = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scoring_weights_must_sum_to_one() {
        let mut config = PipelineConfig::default();
        config.scoring.weights.duration = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_weight_is_fatal() {
        let mut config = PipelineConfig::default();
        config.comprehensive.weights.mpa_violation = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_bin_cap_is_fatal() {
        let mut config = PipelineConfig::default();
        config.proximity.max_points_per_bin = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let raw = r#"
            [detection]
            threshold_minutes = 180.0

            [proximity]
            distance_threshold_km = 10.0
        "#;
        let config: PipelineConfig = toml::from_str(raw).expect("parses");
        assert!((config.detection.threshold_minutes - 180.0).abs() < f64::EPSILON);
        assert!((config.proximity.distance_threshold_km - 10.0).abs() < f64::EPSILON);
        // untouched sections keep their defaults
        assert_eq!(config.dbscan.min_samples, 3);
        assert!((config.scoring.weights.duration - 0.30).abs() < f64::EPSILON);
        config.validate().expect("still valid");
    }

    #[test]
    fn eps_degrees_conversion() {
        let dbscan = DbscanConfig::default();
        assert!((dbscan.eps_degrees() - 50.0 / 111.0).abs() < 1e-12);
    }
}
