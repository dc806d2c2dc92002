//! Resumable progress for the proximity indexer.

use crate::types::ProximityEncounter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint at {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Accumulated proximity state persisted between runs.
///
/// Bin keys are the floored epoch seconds of each completed bin; a bin in
/// `processed_bins` is never re-joined, so its encounters are final.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub processed_bins: BTreeSet<i64>,
    pub encounters: Vec<ProximityEncounter>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint: Checkpoint =
            serde_json::from_str(&raw).map_err(|source| CheckpointError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            path = %path.display(),
            bins = checkpoint.processed_bins.len(),
            encounters = checkpoint.encounters.len(),
            "resuming proximity index from checkpoint"
        );
        Ok(checkpoint)
    }

    /// Serialize to `<path>.tmp`, then atomically rename over `path`, so a
    /// crash mid-write never leaves a truncated checkpoint behind.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(self).map_err(|source| CheckpointError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| CheckpointError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
