//! Proximity Index Module (C3)
//!
//! Time-bucketed spatial join over the full fix stream: for every time bin,
//! all vessel pairs within the distance threshold become
//! [`ProximityEncounter`](crate::types::ProximityEncounter) records.
//!
//! The join is worst-case quadratic per bin, so dense bins are subsampled
//! deterministically and progress is checkpointed: every `save_every` bins
//! the accumulated encounters and processed bin keys are persisted, and a
//! restarted run skips completed bins instead of redoing hours of work.

mod checkpoint;
mod indexer;

pub use checkpoint::{Checkpoint, CheckpointError};
pub use indexer::{build_proximity_index, ProximityIndex};
