//! Pipeline Configuration Module
//!
//! Every tunable the pipeline recognizes lives in one immutable
//! [`PipelineConfig`] value, loaded from TOML and passed by reference into
//! each stage. There are no configuration globals.
//!
//! ## Loading Order
//!
//! 1. `FISHNET_CONFIG` environment variable (path to TOML file)
//! 2. `fishnet.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Validation runs once at startup and is fatal on invariant violations
//! (negative thresholds, weights outside [0, 1], weight sums away from 1).

mod pipeline_config;

pub use pipeline_config::*;
