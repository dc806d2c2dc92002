//! Dark Event Detection Module (C2)
//!
//! Per-vessel ordered scan over the fix stream: a dark event is emitted for
//! every transmission gap strictly exceeding the configured threshold.
//! Vessels are independent, so the scan fans out across a worker pool.
//!
//! Fleet enrichment is a separate post-step so detection stays a pure
//! function of the fix stream.

mod gap_detector;

pub use gap_detector::{attach_fleet, detect_dark_events};
