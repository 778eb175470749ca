//! Workflow configuration.
//!
//! [`WorkflowConfig`] is passed explicitly to
//! [`WorkflowEngine::new`](crate::workflow::WorkflowEngine::new); nothing in
//! the workflow reads process-wide state.  Every field has a documented
//! default so a partial `[workflow]` TOML section is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// How the classification stage decides the intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Ask the model for a single label at temperature zero.
    #[default]
    Model,
    /// Match keyword rules locally; never calls the model.
    Keywords,
}

/// Weights of the three confidence signals.
///
/// The weighted mean of the signals is mapped onto `[floor, 1.0]`, so a run
/// with every signal missing still reports `floor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Fraction of retrieval slots filled above the score threshold.
    pub retrieval: f64,
    /// Weather data present.
    pub weather: f64,
    /// Points of interest non-empty.
    pub poi: f64,
    /// Lowest reportable confidence.
    pub floor: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            retrieval: 0.6,
            weather: 0.2,
            poi: 0.2,
            floor: 0.1,
        }
    }
}

impl ConfidenceWeights {
    pub fn total(&self) -> f64 {
        self.retrieval + self.weather + self.poi
    }
}

/// Tunables for one [`WorkflowEngine`](crate::workflow::WorkflowEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Retrieval slots (K).
    pub top_k: usize,
    /// Minimum similarity for a snippet to count as a filled slot.
    pub score_threshold: f32,
    /// Deadline for the whole pipeline.
    pub request_timeout_ms: u64,
    /// Independent limit for each real-time provider call.
    pub provider_timeout_ms: u64,
    /// Limit for the classification model call.
    pub classification_timeout_ms: u64,
    /// Part of the request deadline held back for synthesis; the fetch stage
    /// must finish before `request_timeout_ms - synthesis_reserve_ms`.
    pub synthesis_reserve_ms: u64,
    /// Longest trip accepted, in days.
    pub max_days: u32,
    pub classifier: ClassifierMode,
    pub classification_model: String,
    pub synthesis_model: String,
    pub synthesis_temperature: f32,
    pub synthesis_max_tokens: u32,
    /// Pacing bound handed to the itinerary instructions.
    pub max_activities_per_day: u32,
    /// Points of interest listed in the synthesis payload.
    pub max_pois_in_prompt: usize,
    pub confidence: ConfidenceWeights,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.3,
            request_timeout_ms: 60_000,
            provider_timeout_ms: 5_000,
            classification_timeout_ms: 15_000,
            synthesis_reserve_ms: 10_000,
            max_days: 30,
            classifier: ClassifierMode::Model,
            classification_model: "gpt-4o-mini".into(),
            synthesis_model: "gpt-4o-mini".into(),
            synthesis_temperature: 0.7,
            synthesis_max_tokens: 2000,
            max_activities_per_day: 4,
            max_pois_in_prompt: 12,
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn classification_timeout(&self) -> Duration {
        Duration::from_millis(self.classification_timeout_ms)
    }

    /// Time from request start by which the fetch stage must be done.
    pub fn fetch_budget(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .saturating_sub(self.synthesis_reserve_ms),
        )
    }

    /// Reject settings that would make the workflow or the confidence
    /// score ill-defined.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(WorkflowError::Config {
                reason: reason.to_owned(),
            })
        };

        if self.top_k == 0 {
            return fail("top_k must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return fail("score_threshold must be within [0, 1]");
        }
        if self.request_timeout_ms == 0
            || self.provider_timeout_ms == 0
            || self.classification_timeout_ms == 0
        {
            return fail("timeouts must be greater than zero");
        }
        if self.synthesis_reserve_ms == 0 || self.synthesis_reserve_ms >= self.request_timeout_ms {
            return fail("synthesis_reserve_ms must be within (0, request_timeout_ms)");
        }
        if self.max_days == 0 {
            return fail("max_days must be at least 1");
        }
        if self.max_activities_per_day == 0 {
            return fail("max_activities_per_day must be at least 1");
        }

        let w = &self.confidence;
        if [w.retrieval, w.weather, w.poi]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return fail("confidence weights must be finite and non-negative");
        }
        if w.total() <= 0.0 {
            return fail("confidence weights must not all be zero");
        }
        if !(0.0..1.0).contains(&w.floor) {
            return fail("confidence floor must be within [0, 1)");
        }
        Ok(())
    }
}
