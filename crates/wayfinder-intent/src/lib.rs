//! The Wayfinder travel workflow.
//!
//! This crate provides:
//!
//! - **Request state**: validated input and write-once derived fields via
//!   [`state::RequestState`].
//! - **Stages**: intent classification ([`classifier`]), knowledge retrieval
//!   ([`retrieval`]), concurrent real-time fetch ([`realtime`]) and
//!   intent-specific synthesis ([`synthesis`]).
//! - **Confidence scoring**: a pure, monotone score over retrieval quality
//!   and data availability ([`confidence`]).
//! - **Engine**: [`workflow::WorkflowEngine`] sequences the stages under a
//!   per-request deadline and records [`metrics::WorkflowMetrics`].

pub mod classifier;
pub mod confidence;
pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod prompts;
pub mod realtime;
pub mod retrieval;
pub mod state;
pub mod synthesis;
pub mod workflow;

pub use classifier::{Decision, IntentClassifier, classify_keywords, parse_label};
pub use config::{ClassifierMode, ConfidenceWeights, WorkflowConfig};
pub use error::{ErrorKind, Result, WorkflowError};
pub use graph::{GraphDescription, GraphFormat};
pub use metrics::{LatencySummary, MetricsSnapshot, StageLatencies, WorkflowMetrics};
pub use realtime::{FetchOutcome, RealtimeData};
pub use state::{Intent, RequestState, Slot, Stage, StageTimings, TripPlan, TripRequest};
pub use synthesis::SUGGESTIONS_ONLY_NOTE;
pub use workflow::WorkflowEngine;
