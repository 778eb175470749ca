//! Provider error types.
//!
//! Every data provider and the retrieval service surface failures through
//! [`ProviderError`].  The workflow absorbs these into degraded values, so
//! the variants exist mainly for logs and for the retry policy.

/// Unified error type for Wayfinder data providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("{provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// The upstream service answered with a non-success status.
    #[error("{provider} returned status {status}")]
    BadStatus { provider: String, status: u16 },

    /// The response body did not have the expected shape.
    #[error("{provider} response parse error: {reason}")]
    ParseFailed { provider: String, reason: String },

    /// The location could not be resolved to coordinates or an area.
    #[error("location not found: {location}")]
    LocationNotFound { location: String },

    /// An operation exceeded its time limit.
    #[error("{provider} timed out after {millis}ms")]
    Timeout { provider: String, millis: u64 },

    /// The knowledge base could not be loaded.
    #[error("knowledge base error: {reason}")]
    Knowledge { reason: String },

    /// An I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed { .. } | Self::Timeout { .. } => true,
            Self::BadStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, ProviderError>;
