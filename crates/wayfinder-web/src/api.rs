//! REST API route handlers.
//!
//! Provides the plan endpoint plus health, status, metrics and workflow-graph
//! introspection.  Handlers only translate between JSON and the workflow
//! engine; every decision about the request is made by the engine.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use wayfinder_adapters::{PlaceRecord, WeatherRecord};
use wayfinder_intent::graph::{self, GraphFormat};
use wayfinder_intent::{
    ErrorKind, Intent, MetricsSnapshot, StageTimings, TripPlan, WorkflowError,
};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::InvalidInput,
            message: message.into(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }
        let body = json!({ "error": self.message, "kind": self.kind });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// POST /api/plan
// ---------------------------------------------------------------------------

/// Request body for `POST /api/plan`.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub city: String,
    pub days: i64,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Response body for `POST /api/plan`.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub request_id: Uuid,
    pub intent: Intent,
    pub plan: String,
    pub city: String,
    pub days: u32,
    pub preferences: Option<String>,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub weather: Option<WeatherRecord>,
    pub pois: Vec<PlaceRecord>,
    pub timings: StageTimings,
}

impl From<TripPlan> for PlanResponse {
    fn from(plan: TripPlan) -> Self {
        Self {
            request_id: plan.request_id,
            intent: plan.intent,
            plan: plan.response,
            city: plan.city,
            days: plan.days,
            preferences: plan.preferences,
            sources: plan.sources,
            confidence: plan.confidence,
            weather: plan.weather,
            pois: plan.pois,
            timings: plan.timings,
        }
    }
}

/// Run the travel workflow for one request.
pub async fn plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, ApiError> {
    let Json(req) = payload?;
    tracing::info!(city = %req.city, days = req.days, "plan request");

    let plan = state
        .engine
        .plan(&req.city, req.days, req.preferences, req.query)
        .await?;
    Ok(Json(plan.into()))
}

// ---------------------------------------------------------------------------
// GET /api/health, GET /api/status
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Response payload for the `/api/status` endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub in_flight: u64,
    pub metrics: MetricsSnapshot,
}

/// Version, uptime, run counters and stage latencies.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let metrics = state.engine.metrics();
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        in_flight: metrics.in_flight(),
        metrics,
    })
}

// ---------------------------------------------------------------------------
// GET /api/metrics
// ---------------------------------------------------------------------------

/// The same counters and latencies as `/api/status`, for Prometheus scrapes.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.engine.metrics().to_prometheus(),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /api/graph
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    pub format: Option<String>,
}

/// The workflow graph as Mermaid (default), ASCII or JSON.
pub async fn graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GraphQuery>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<GraphFormat>()?,
        None => GraphFormat::default(),
    };
    let config = state.engine.config();

    let response = match format {
        GraphFormat::Json => Json(graph::describe(config)).into_response(),
        text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            graph::render(config, text),
        )
            .into_response(),
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found", "kind": "not_found" })),
    )
}

#[cfg(test)]
mod tests {
    use wayfinder_agent::AgentError;
    use wayfinder_intent::Stage;

    use super::*;

    #[test]
    fn workflow_errors_map_to_status_codes() {
        let cases = [
            (
                WorkflowError::InvalidInput {
                    reason: "days must be positive".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                WorkflowError::Synthesis(AgentError::EmptyResponse),
                StatusCode::BAD_GATEWAY,
            ),
            (
                WorkflowError::DeadlineExceeded {
                    stage: Stage::Retrieve,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                WorkflowError::StateViolation {
                    reason: "intent written twice".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn plan_request_defaults_optional_fields() {
        let req: PlanRequest = serde_json::from_str(r#"{"city": "Lisbon", "days": 2}"#).unwrap();
        assert_eq!(req.city, "Lisbon");
        assert!(req.preferences.is_none() && req.query.is_none());
    }
}
