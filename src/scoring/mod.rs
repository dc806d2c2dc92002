//! Multi-Factor Suspicion Scoring Module (C5)
//!
//! Combines gap duration, coverage reliability, EEZ proximity, fishing
//! evidence, and repeat-offender history into one weighted suspicion score
//! per event. Sub-scores are stored already weighted, so the total is their
//! plain sum and lies in [0, 1] when the configured weights sum to 1.

use crate::cancel::CancelFlag;
use crate::config::PipelineConfig;
use crate::types::{ContextualizedEvent, ScoredEvent, SuspicionScores};
use std::collections::HashMap;
use tracing::info;

/// Score all contextualized events and sort them by
/// `(total_score desc, mmsi, start)`.
///
/// Repeat-offender counts are taken over the input events themselves: a
/// vessel's tenth dark event in the batch maxes out the repeat factor.
/// Cancellation is honored per event; already scored events are kept.
pub fn score_events(
    events: Vec<ContextualizedEvent>,
    config: &PipelineConfig,
    cancel: &CancelFlag,
) -> Vec<ScoredEvent> {
    let mut repeat_counts: HashMap<u32, usize> = HashMap::new();
    for event in &events {
        *repeat_counts.entry(event.event.mmsi).or_insert(0) += 1;
    }

    let threshold = config.scoring.highly_suspicious_threshold;
    let mut scored: Vec<ScoredEvent> = Vec::with_capacity(events.len());
    for context in events {
        if cancel.is_cancelled() {
            break;
        }
        let repeats = repeat_counts.get(&context.event.mmsi).copied().unwrap_or(0);
        let scores = score_one(&context, repeats, config);
        scored.push(ScoredEvent {
            is_highly_suspicious: scores.total_score >= threshold,
            cluster_id: -1,
            context,
            scores,
        });
    }

    scored.sort_by(|a, b| {
        b.scores
            .total_score
            .partial_cmp(&a.scores.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.mmsi().cmp(&b.mmsi()))
            .then_with(|| a.context.event.start.cmp(&b.context.event.start))
    });

    let highly_suspicious = scored.iter().filter(|e| e.is_highly_suspicious).count();
    info!(
        events = scored.len(),
        highly_suspicious,
        "suspicion scoring complete"
    );
    scored
}

fn score_one(
    context: &ContextualizedEvent,
    repeat_count: usize,
    config: &PipelineConfig,
) -> SuspicionScores {
    let w = &config.scoring.weights;
    let event = &context.event;

    // Gap duration, saturating at 6 hours
    let duration_score = (event.duration_hours / 6.0).min(1.0) * w.duration;

    // Low coverage reliability means the silence is less explainable
    let coverage_score = (1.0 - context.coverage_reliability) * w.coverage;

    // Close to an EEZ boundary band is more suspicious
    let eez_score = (1.0 - eez_proximity(event.location.lat)) * w.eez;

    // Fishing vessel itself, and fishing activity transmitting nearby
    let fishing_score = (0.5 * f64::from(u8::from(event.is_fishing_vessel))
        + 0.5 * f64::from(u8::from(context.continuously_transmitting_nearby > 0)))
        * w.fishing;

    // Repeat offenders, saturating at 10 events
    let repeat_score = (repeat_count as f64 / 10.0).min(1.0) * w.repeat;

    SuspicionScores {
        duration_score,
        coverage_score,
        eez_score,
        fishing_score,
        repeat_score,
        total_score: duration_score + coverage_score + eez_score + fishing_score + repeat_score,
    }
}

/// Coarse distance-to-EEZ factor: 0.1 inside the coastal latitude bands,
/// 1.0 elsewhere. A placeholder for real EEZ boundary data; the scorer only
/// consumes `1 - eez_proximity`.
fn eez_proximity(lat: f64) -> f64 {
    let coastal_bands = [(35.0, 45.0), (-45.0, -35.0), (-10.0, 10.0)];
    if coastal_bands.iter().any(|&(lo, hi)| (lo..=hi).contains(&lat)) {
        0.1
    } else {
        1.0
    }
}
