//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.  The engine itself is stateless per request, so no locking is
//! needed here.

use std::sync::Arc;
use std::time::Instant;

use wayfinder_intent::WorkflowEngine;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
pub struct AppState {
    /// The workflow engine serving every request.
    pub engine: Arc<WorkflowEngine>,

    /// Web server configuration.
    pub config: WebConfig,

    /// When the server state was created, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<WorkflowEngine>, config: WebConfig) -> Self {
        Self {
            engine,
            config,
            started_at: Instant::now(),
        }
    }
}
