//! Confidence scoring and source attribution.
//!
//! ```text
//! fill       = min(1, |{s : s.score >= threshold}| / top_k)
//! raw        = (w_r * fill + w_w * weather + w_p * poi) / (w_r + w_w + w_p)
//! confidence = floor + (1 - floor) * raw
//! ```
//!
//! The score is a pure function of the three signals and the weights, and is
//! non-decreasing in each signal.

use serde::Serialize;
use wayfinder_adapters::Snippet;

use crate::config::ConfidenceWeights;

/// The inputs to the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signals {
    /// Fraction of retrieval slots filled above the threshold, in `[0, 1]`.
    pub retrieval_fill: f64,
    pub weather_present: bool,
    pub pois_present: bool,
}

impl Signals {
    pub fn new(
        snippets: &[Snippet],
        top_k: usize,
        score_threshold: f32,
        weather_present: bool,
        pois_present: bool,
    ) -> Self {
        Self {
            retrieval_fill: retrieval_fill(snippets, top_k, score_threshold),
            weather_present,
            pois_present,
        }
    }
}

pub fn retrieval_fill(snippets: &[Snippet], top_k: usize, score_threshold: f32) -> f64 {
    if top_k == 0 {
        return 0.0;
    }
    let filled = snippets
        .iter()
        .filter(|s| s.score >= score_threshold)
        .count();
    (filled as f64 / top_k as f64).min(1.0)
}

/// Weighted score in `[floor, 1]`.
pub fn score(signals: &Signals, weights: &ConfidenceWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return weights.floor.clamp(0.0, 1.0);
    }
    let indicator = |present: bool| if present { 1.0 } else { 0.0 };
    let raw = (weights.retrieval * signals.retrieval_fill.clamp(0.0, 1.0)
        + weights.weather * indicator(signals.weather_present)
        + weights.poi * indicator(signals.pois_present))
        / total;
    (weights.floor + (1.0 - weights.floor) * raw).clamp(0.0, 1.0)
}

/// Citation list: knowledge sources in first-seen order, then the provider
/// ids of the real-time sources that contributed data.
pub fn collect_sources(
    snippets: &[Snippet],
    weather_provider: Option<&str>,
    poi_provider: Option<&str>,
) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for s in snippets {
        if !sources.contains(&s.source_id) {
            sources.push(s.source_id.clone());
        }
    }
    sources.extend(weather_provider.map(str::to_owned));
    sources.extend(poi_provider.map(str::to_owned));
    sources
}
