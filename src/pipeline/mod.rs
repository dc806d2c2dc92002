//! Pipeline Orchestration Module
//!
//! Runs the analysis stages in order on one batch of AIS records:
//!
//! ```text
//! C1 loader        -> FixStore, FleetRegistry, MpaTable   (done by the caller)
//! C2 gap detector  -> dark events (+ fleet enrichment)
//! C3 proximity     -> pair encounters        (full mode only, checkpointed)
//! C4 context       -> contextualized events  (index-backed or synthetic)
//! C5 scorer        -> scored events, ranked
//! C6 aggregator    -> clusters + grid cells
//! C7 comprehensive -> suspicious segments + vessel profiles
//! C8 network       -> graph, centralities, communities, roles
//! ```
//!
//! Every stage takes the shared immutable config by reference and returns a
//! new collection; empty inputs flow through as empty outputs.

use crate::cancel::CancelFlag;
use crate::comprehensive::{self, SuspiciousSegment, VesselRiskProfile};
use crate::config::PipelineConfig;
use crate::context::{contextualize_events, ContextSource};
use crate::detection;
use crate::hotspots::{self, Cluster, GridCell};
use crate::loader::{FixStore, MpaTable};
use crate::network::{
    self, CentralityScore, Community, Coordinator, Mothership, NetworkStats,
};
use crate::output::{self, OutputError};
use crate::proximity::{build_proximity_index, CheckpointError, ProximityIndex};
use crate::scoring;
use crate::types::{DarkEvent, FleetRegistry, ScoredEvent};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Whether to build the proximity index or run the degraded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Build the proximity index (slow, checkpointed) and use it for context
    Full,
    /// Skip the index; synthetic context from a fixed seed
    Fast,
}

/// Reference data and records for one run, loaded by the caller (C1).
#[derive(Debug, Default)]
pub struct PipelineInputs {
    pub store: FixStore,
    pub fleet: FleetRegistry,
    pub mpa: MpaTable,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: RunMode,
    /// Proximity checkpoint location (full mode only)
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { mode: RunMode::Full, checkpoint_path: None }
    }
}

/// Every result collection of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutputs {
    pub mode: RunMode,
    pub enhanced_dark_events: Vec<DarkEvent>,
    pub proximity_index: ProximityIndex,
    pub scored_dark_events: Vec<ScoredEvent>,
    pub dark_zone_clusters: Vec<Cluster>,
    pub dark_zone_hexbins: Vec<GridCell>,
    pub suspicious_segments: Vec<SuspiciousSegment>,
    pub vessel_risk_profiles: Vec<VesselRiskProfile>,
    pub centrality_scores: Vec<CentralityScore>,
    pub vessel_communities: Vec<Community>,
    pub coordinators: Vec<Coordinator>,
    pub potential_motherships: Vec<Mothership>,
    pub network_stats: NetworkStats,
}

/// Run the full analysis pipeline on one batch.
pub fn run_pipeline(
    inputs: &PipelineInputs,
    config: &PipelineConfig,
    options: &PipelineOptions,
    cancel: &CancelFlag,
) -> Result<PipelineOutputs, PipelineError> {
    let started = std::time::Instant::now();
    info!(
        records = inputs.store.len(),
        vessels = inputs.store.vessel_count(),
        mode = ?options.mode,
        "pipeline starting"
    );

    // C2: gap detection + fleet enrichment
    let events = detection::detect_dark_events(&inputs.store, config, cancel);
    let enhanced_dark_events = detection::attach_fleet(events, &inputs.fleet);

    // C3 + C4: proximity index and context, or the explicit degraded mode
    let proximity_index = match options.mode {
        RunMode::Full => build_proximity_index(
            &inputs.store,
            config,
            options.checkpoint_path.as_deref(),
            cancel,
        )?,
        RunMode::Fast => ProximityIndex::default(),
    };
    let source = match options.mode {
        RunMode::Full => ContextSource::FromIndex(&proximity_index),
        RunMode::Fast => ContextSource::Synthetic { seed: config.context.synthetic_seed },
    };
    let contextualized =
        contextualize_events(enhanced_dark_events.clone(), source, &inputs.store, config);

    // C5: multi-factor scoring
    let scored = scoring::score_events(contextualized, config, cancel);

    // C6: spatial aggregation
    let (scored_dark_events, dark_zone_clusters) = hotspots::cluster_events(scored, config);
    let dark_zone_hexbins = hotspots::grid_bins(&scored_dark_events, config);

    // C7: comprehensive per-segment evaluation
    let suspicious_segments =
        comprehensive::detect_suspicious_segments(&inputs.store, config, &inputs.mpa);
    let vessel_risk_profiles = comprehensive::vessel_risk_profiles(&suspicious_segments);

    // C8: coordination network
    let graph = network::build_vessel_graph(
        &scored_dark_events,
        &inputs.store,
        &inputs.fleet,
        config,
    );
    let centrality = network::centrality_scores(&graph);
    let vessel_communities = network::detect_communities(&graph, config.network.louvain_seed);
    let coordinators = network::identify_coordinators(&centrality);
    let potential_motherships = network::identify_motherships(&graph);
    let network_stats = network::network_stats(&graph);

    info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        dark_events = enhanced_dark_events.len(),
        encounters = proximity_index.len(),
        segments = suspicious_segments.len(),
        "pipeline complete"
    );

    Ok(PipelineOutputs {
        mode: options.mode,
        enhanced_dark_events,
        proximity_index,
        scored_dark_events,
        dark_zone_clusters,
        dark_zone_hexbins,
        suspicious_segments,
        vessel_risk_profiles,
        centrality_scores: centrality,
        vessel_communities,
        coordinators,
        potential_motherships,
        network_stats,
    })
}

/// Write every result collection as canonical JSON under `out_dir`.
///
/// `proximity_index.json` is only written in full mode; the other files are
/// always produced, empty collections included.
pub fn write_outputs(outputs: &PipelineOutputs, out_dir: &Path) -> Result<(), OutputError> {
    output::write_json(
        &out_dir.join("enhanced_dark_events.json"),
        &outputs.enhanced_dark_events,
    )?;
    if outputs.mode == RunMode::Full {
        output::write_json(
            &out_dir.join("proximity_index.json"),
            &outputs.proximity_index.encounters(),
        )?;
    }
    output::write_json(
        &out_dir.join("scored_dark_events.json"),
        &outputs.scored_dark_events,
    )?;
    output::write_json(
        &out_dir.join("dark_zone_clusters.json"),
        &outputs.dark_zone_clusters,
    )?;
    output::write_json(&out_dir.join("dark_zone_hexbins.json"), &outputs.dark_zone_hexbins)?;
    output::write_json(
        &out_dir.join("suspicious_segments.json"),
        &outputs.suspicious_segments,
    )?;
    output::write_json(
        &out_dir.join("vessel_risk_profiles.json"),
        &outputs.vessel_risk_profiles,
    )?;
    output::write_json(
        &out_dir.join("centrality_scores.json"),
        &outputs.centrality_scores,
    )?;
    output::write_json(
        &out_dir.join("vessel_communities.json"),
        &outputs.vessel_communities,
    )?;
    output::write_json(&out_dir.join("coordinators.json"), &outputs.coordinators)?;
    output::write_json(
        &out_dir.join("potential_motherships.json"),
        &outputs.potential_motherships,
    )?;
    output::write_json(&out_dir.join("network_stats.json"), &outputs.network_stats)?;
    Ok(())
}
