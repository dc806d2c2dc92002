//! FishNet: AIS dark-event detection and vessel coordination analysis
//!
//! Batch analytical pipeline over AIS position reports:
//!
//! - **Gap detection**: per-vessel transmission gaps become dark events
//! - **Proximity index**: time-binned spatial join of all fixes into
//!   vessel-pair encounters (checkpointed, resumable)
//! - **Context & scoring**: nearby-vessel evidence plus multi-factor
//!   suspicion scores per event
//! - **Spatial aggregation**: DBSCAN hotspots and heatmap grid cells
//! - **Comprehensive risk**: independent per-segment risk evaluation and
//!   vessel risk profiles
//! - **Network analysis**: co-occurrence graph with centralities, Louvain
//!   communities, coordinator and mothership identification

pub mod cancel;
pub mod comprehensive;
pub mod config;
pub mod context;
pub mod detection;
pub mod geo;
pub mod hotspots;
pub mod loader;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod proximity;
pub mod scoring;
pub mod types;

// Re-export the record model
pub use types::{
    ContextualizedEvent, DarkEvent, FishingStatus, Fix, FleetRegistry, GearType, Position,
    ProximityEncounter, Region, ScoredEvent, SuspicionScores,
};

// Re-export configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export the orchestrator surface
pub use cancel::CancelFlag;
pub use pipeline::{
    run_pipeline, write_outputs, PipelineError, PipelineInputs, PipelineOptions, PipelineOutputs,
    RunMode,
};

// Re-export loader entry points
pub use loader::{
    load_ais_csv, load_fleet_dir, load_mpa_csv, FixStore, LoaderError, MpaLookup, MpaTable,
};
