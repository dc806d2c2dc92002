//! Context Enrichment Module (C4)
//!
//! For each dark event, aggregates nearby-vessel evidence into a coverage
//! reliability and confidence score. The evidence source is explicit:
//! [`ContextSource::FromIndex`] consults the proximity index and the fix
//! stream; [`ContextSource::Synthetic`] is the degraded fast mode that draws
//! nearby counts from a fixed RNG when no index was built. The scorer
//! consumes the enriched events without knowing which mode produced them.

mod enricher;

pub use enricher::{contextualize_events, ContextSource};
