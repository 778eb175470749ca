//! Workflow error types.
//!
//! Only fatal conditions are represented here.  Recoverable stage failures
//! (classification, retrieval, provider outages) are absorbed inside the
//! stage that hit them and never reach the caller.

use serde::Serialize;

use crate::state::Stage;

/// Unified error type for the travel workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The request was rejected before the workflow started.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The model caller failed during synthesis.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] wayfinder_agent::AgentError),

    /// The per-request deadline elapsed in a stage with no degraded output.
    #[error("request deadline exceeded during {stage}")]
    DeadlineExceeded { stage: Stage },

    /// A state field was written twice or read before it was written.
    #[error("state violation: {reason}")]
    StateViolation { reason: String },

    /// The workflow configuration is inconsistent.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

/// Coarse classification of a [`WorkflowError`] for request adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UpstreamUnavailable,
    TimedOut,
    Internal,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Synthesis(wayfinder_agent::AgentError::Timeout { .. }) => ErrorKind::TimedOut,
            Self::Synthesis(_) => ErrorKind::UpstreamUnavailable,
            Self::DeadlineExceeded { .. } => ErrorKind::TimedOut,
            Self::StateViolation { .. } | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;
