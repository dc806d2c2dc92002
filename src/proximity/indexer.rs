//! Time-binned spatial join with deterministic subsampling.

use super::{Checkpoint, CheckpointError};
use crate::cancel::CancelFlag;
use crate::config::PipelineConfig;
use crate::geo;
use crate::loader::FixStore;
use crate::types::{Fix, Position, ProximityEncounter};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, RTree};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// The completed proximity index: all encounters, sorted by
/// `(time_bin, vessel1, vessel2)` for reproducible output and binary-search
/// window queries.
#[derive(Debug, Clone, Default)]
pub struct ProximityIndex {
    encounters: Vec<ProximityEncounter>,
}

impl ProximityIndex {
    pub fn from_encounters(mut encounters: Vec<ProximityEncounter>) -> Self {
        encounters.sort_by(|a, b| {
            (a.time_bin, a.vessel1_mmsi, a.vessel2_mmsi)
                .cmp(&(b.time_bin, b.vessel1_mmsi, b.vessel2_mmsi))
        });
        Self { encounters }
    }

    pub fn encounters(&self) -> &[ProximityEncounter] {
        &self.encounters
    }

    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    /// Encounters whose time bin lies in `[from, to]` (inclusive).
    pub fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[ProximityEncounter] {
        let lo = self.encounters.partition_point(|e| e.time_bin < from);
        let hi = self.encounters.partition_point(|e| e.time_bin <= to);
        &self.encounters[lo..hi]
    }
}

/// Build the proximity index over the full fix stream.
///
/// When `checkpoint_path` is given, completed bins are skipped on resume and
/// progress is persisted every `save_every` bins. Cancellation is honored at
/// bin-batch boundaries; the checkpoint stays intact and the partial index
/// is returned.
pub fn build_proximity_index(
    store: &FixStore,
    config: &PipelineConfig,
    checkpoint_path: Option<&Path>,
    cancel: &CancelFlag,
) -> Result<ProximityIndex, CheckpointError> {
    let bin_width_secs = config.proximity.time_window_minutes * 60;

    // Bucket fixes by floored timestamp. BTreeMap keeps bin order stable.
    let mut bins: BTreeMap<i64, Vec<&Fix>> = BTreeMap::new();
    for fix in store.fixes() {
        if !fix.lat.is_finite() || !fix.lon.is_finite() {
            continue;
        }
        let key = fix.timestamp.timestamp().div_euclid(bin_width_secs) * bin_width_secs;
        bins.entry(key).or_default().push(fix);
    }
    let total_bins = bins.len();

    let mut checkpoint = match checkpoint_path {
        Some(path) if path.exists() => match Checkpoint::load(path) {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                warn!(error = %err, "could not resume from checkpoint, starting fresh");
                Checkpoint::default()
            }
        },
        _ => Checkpoint::default(),
    };

    info!(
        records = store.len(),
        bins = total_bins,
        window_minutes = config.proximity.time_window_minutes,
        threshold_km = config.proximity.distance_threshold_km,
        already_done = checkpoint.processed_bins.len(),
        "building proximity index"
    );

    let pending: Vec<(i64, Vec<&Fix>)> = bins
        .into_iter()
        .filter(|(key, _)| !checkpoint.processed_bins.contains(key))
        .collect();

    let mut bins_done = total_bins - pending.len();
    let mut last_progress = bins_done;
    for batch in pending.chunks(config.proximity.save_every) {
        if cancel.is_cancelled() {
            info!(bins_done, total_bins, "proximity indexing cancelled at bin boundary");
            break;
        }

        // Bins are independent; join them on the worker pool, then append
        // results in bin order so output is deterministic.
        let batch_results: Vec<(i64, Vec<ProximityEncounter>)> = batch
            .par_iter()
            .map(|(key, fixes)| (*key, join_bin(*key, fixes, config)))
            .collect();

        for (key, mut encounters) in batch_results {
            checkpoint.encounters.append(&mut encounters);
            checkpoint.processed_bins.insert(key);
        }
        bins_done += batch.len();

        if bins_done - last_progress >= config.proximity.progress_every {
            info!(
                bins_done,
                total_bins,
                encounters = checkpoint.encounters.len(),
                "proximity indexing progress"
            );
            last_progress = bins_done;
        }
        if let Some(path) = checkpoint_path {
            checkpoint.save(path)?;
        }
    }

    info!(
        encounters = checkpoint.encounters.len(),
        "proximity index complete"
    );
    Ok(ProximityIndex::from_encounters(checkpoint.encounters))
}

/// Join one time bin: subsample if dense, radius-query an R*-tree of
/// unit-sphere points, refilter candidates with exact haversine, and emit
/// canonical encounters.
fn join_bin(bin_key: i64, fixes: &[&Fix], config: &PipelineConfig) -> Vec<ProximityEncounter> {
    if fixes.len() < 2 {
        return Vec::new();
    }
    let Some(time_bin) = DateTime::<Utc>::from_timestamp(bin_key, 0) else {
        warn!(bin_key, "bin key out of timestamp range, skipping");
        return Vec::new();
    };

    // Deterministic uniform subsample of dense bins. Indices are re-sorted
    // so pairing order does not depend on the draw order.
    let cap = config.proximity.max_points_per_bin;
    let selected: Vec<&Fix> = if fixes.len() > cap {
        let mut rng = StdRng::seed_from_u64(config.proximity.sample_seed);
        let mut picked = rand::seq::index::sample(&mut rng, fixes.len(), cap).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| fixes[i]).collect()
    } else {
        fixes.to_vec()
    };

    let tree: RTree<GeomWithData<[f64; 3], usize>> = RTree::bulk_load(
        selected
            .iter()
            .enumerate()
            .map(|(i, fix)| {
                GeomWithData::new(geo::unit_sphere(f64::from(fix.lat), f64::from(fix.lon)), i)
            })
            .collect(),
    );
    let chord_sq = geo::chord_sq_for_km(config.proximity.distance_threshold_km);

    // Candidate pairs: neighbors with a strictly greater index, so each
    // unordered pair is visited once.
    let mut candidates: Vec<(usize, usize)> = Vec::new();
    let pair_cap = cap.saturating_mul(cap);
    for (i, fix) in selected.iter().enumerate() {
        let origin = geo::unit_sphere(f64::from(fix.lat), f64::from(fix.lon));
        for neighbor in tree.locate_within_distance(origin, chord_sq) {
            if neighbor.data > i {
                candidates.push((i, neighbor.data));
            }
        }
        if candidates.len() > pair_cap {
            warn!(
                bin_key,
                candidates = candidates.len(),
                pair_cap,
                "bin exceeded the candidate pair cap after sampling, skipping bin"
            );
            return Vec::new();
        }
    }

    let mut encounters: Vec<ProximityEncounter> = candidates
        .into_iter()
        .filter_map(|(i, j)| {
            let (a, b) = (selected[i], selected[j]);
            if a.mmsi == b.mmsi {
                return None;
            }
            let distance_km = geo::haversine_km(
                f64::from(a.lat),
                f64::from(a.lon),
                f64::from(b.lat),
                f64::from(b.lon),
            );
            (distance_km <= config.proximity.distance_threshold_km).then(|| {
                ProximityEncounter::canonical(
                    time_bin,
                    a.mmsi,
                    Position::from(a),
                    b.mmsi,
                    Position::from(b),
                    distance_km,
                )
            })
        })
        .collect();

    encounters.sort_by(|a, b| {
        (a.vessel1_mmsi, a.vessel2_mmsi).cmp(&(b.vessel1_mmsi, b.vessel2_mmsi))
    });
    encounters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FishingStatus;
    use chrono::TimeZone;

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

    #[test]
    fn close_pair_in_same_bin_yields_one_canonical_encounter() {
        // ~0.05 degrees of latitude apart: ~5.6 km, well under 20 km
        let store = FixStore::from_fixes(vec![
            fix(900, 0, 10.00, 20.0),
            fix(100, 60, 10.05, 20.0),
        ]);
        let index = build_proximity_index(
            &store,
            &PipelineConfig::default(),
            None,
            &CancelFlag::new(),
        )
        .expect("index");

        assert_eq!(index.len(), 1);
        let enc = &index.encounters()[0];
        assert_eq!(enc.vessel1_mmsi, 100);
        assert_eq!(enc.vessel2_mmsi, 900);
        assert!(enc.distance_km <= 20.0);
        assert!(enc.distance_km > 5.0);
    }

    #[test]
    fn far_pair_yields_no_encounter() {
        // ~1 degree of latitude apart: ~111 km
        let store = FixStore::from_fixes(vec![
            fix(100, 0, 10.0, 20.0),
            fix(900, 60, 11.0, 20.0),
        ]);
        let index = build_proximity_index(
            &store,
            &PipelineConfig::default(),
            None,
            &CancelFlag::new(),
        )
        .expect("index");
        assert!(index.is_empty());
    }

    #[test]
    fn different_bins_never_pair() {
        let store = FixStore::from_fixes(vec![
            fix(100, 0, 10.0, 20.0),
            fix(900, 1200, 10.0, 20.0), // 20 minutes later, next bin
        ]);
        let index = build_proximity_index(
            &store,
            &PipelineConfig::default(),
            None,
            &CancelFlag::new(),
        )
        .expect("index");
        assert!(index.is_empty());
    }

    #[test]
    fn same_vessel_never_pairs_with_itself() {
        let store = FixStore::from_fixes(vec![
            fix(100, 0, 10.0, 20.0),
            fix(100, 60, 10.01, 20.0),
        ]);
        let index = build_proximity_index(
            &store,
            &PipelineConfig::default(),
            None,
            &CancelFlag::new(),
        )
        .expect("index");
        assert!(index.is_empty());
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        // three vessels in a row: A-B within threshold, A-C beyond it
        let store = FixStore::from_fixes(vec![
            fix(1, 0, 0.0, 0.0),
            fix(2, 10, 0.17, 0.0),  // ~18.9 km from A
            fix(3, 20, 0.36, 0.0),  // ~40.0 km from A, ~21.1 km from B
        ]);
        let index = build_proximity_index(
            &store,
            &PipelineConfig::default(),
            None,
            &CancelFlag::new(),
        )
        .expect("index");
        assert_eq!(index.len(), 1);
        assert_eq!(index.encounters()[0].vessel1_mmsi, 1);
        assert_eq!(index.encounters()[0].vessel2_mmsi, 2);
    }

    #[test]
    fn dense_bin_is_subsampled_deterministically() {
        let mut fixes = Vec::new();
        for i in 0..50u32 {
            fixes.push(fix(1000 + i, i64::from(i), 10.0 + (i as f32) * 0.001, 20.0));
        }
        let mut config = PipelineConfig::default();
        config.proximity.max_points_per_bin = 10;

        let store = FixStore::from_fixes(fixes);
        let first = build_proximity_index(&store, &config, None, &CancelFlag::new())
            .expect("index");
        let second = build_proximity_index(&store, &config, None, &CancelFlag::new())
            .expect("index");

        assert_eq!(first.encounters(), second.encounters(), "fixed-seed subsample");
        // 10 sampled points all within ~50m of each other
        assert_eq!(first.len(), 10 * 9 / 2);
    }

    #[test]
    fn resume_skips_completed_bins() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("checkpoint.json");

        let store = FixStore::from_fixes(vec![
            fix(100, 0, 10.00, 20.0),
            fix(900, 60, 10.05, 20.0),
        ]);
        let config = PipelineConfig::default();

        // Mark the only bin as already processed, with a sentinel encounter.
        let bin_key = store.fixes()[0].timestamp.timestamp().div_euclid(600) * 600;
        let mut done = Checkpoint::default();
        done.processed_bins.insert(bin_key);
        done.encounters.push(ProximityEncounter::canonical(
            Utc.timestamp_opt(bin_key, 0).single().expect("ts"),
            1,
            Position::new(0.0, 0.0),
            2,
            Position::new(0.0, 0.1),
            11.1,
        ));
        done.save(&path).expect("save");

        let index =
            build_proximity_index(&store, &config, Some(&path), &CancelFlag::new())
                .expect("index");
        // The sentinel survives untouched and the bin was not re-joined.
        assert_eq!(index.len(), 1);
        assert_eq!(index.encounters()[0].vessel1_mmsi, 1);
        assert!((index.encounters()[0].distance_km - 11.1).abs() < f64::EPSILON);
    }

    #[test]
    fn checkpoint_written_during_run() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("checkpoint.json");

        let store = FixStore::from_fixes(vec![
            fix(100, 0, 10.00, 20.0),
            fix(900, 60, 10.05, 20.0),
        ]);
        build_proximity_index(
            &store,
            &PipelineConfig::default(),
            Some(&path),
            &CancelFlag::new(),
        )
        .expect("index");

        let checkpoint = Checkpoint::load(&path).expect("checkpoint exists");
        assert_eq!(checkpoint.processed_bins.len(), 1);
        assert_eq!(checkpoint.encounters.len(), 1);
    }

    #[test]
    fn window_query_is_inclusive() {
        let t = |secs: i64| Utc.timestamp_opt(1_704_067_200 + secs, 0).single().expect("ts");
        let enc = |secs: i64| {
            ProximityEncounter::canonical(
                t(secs),
                1,
                Position::default(),
                2,
                Position::default(),
                1.0,
            )
        };
        let index = ProximityIndex::from_encounters(vec![enc(0), enc(600), enc(1200)]);
        assert_eq!(index.in_window(t(0), t(600)).len(), 2);
        assert_eq!(index.in_window(t(601), t(1199)).len(), 0);
        assert_eq!(index.in_window(t(-600), t(1800)).len(), 3);
    }
}
