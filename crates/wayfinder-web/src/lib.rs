//! HTTP interface for the Wayfinder travel workflow.
//!
//! This crate is a thin request adapter around
//! [`WorkflowEngine`](wayfinder_intent::WorkflowEngine):
//!
//! - `POST /api/plan` runs the workflow for a JSON request.
//! - `GET /api/health`, `GET /api/status` report liveness and run counters.
//! - `GET /api/graph` describes the pipeline as Mermaid, ASCII or JSON.
//! - `/` serves a small embedded form for trying requests in a browser.

pub mod api;
pub mod frontend;
pub mod server;
pub mod state;

use serde::Deserialize;

pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Value of `Access-Control-Allow-Origin`; `*` allows any origin.
    pub cors_origin: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            cors_origin: "*".into(),
        }
    }
}
