//! HTTP tests for the wayfinder-web crate.
//!
//! Each test serves the router on an ephemeral port with scripted
//! collaborators behind the workflow engine and talks to it with `reqwest`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use wayfinder_adapters::{
    PlaceRecord, PoiProvider, ProviderError, RetrievalService, Snippet, WeatherProvider,
    WeatherRecord,
};
use wayfinder_agent::{AgentError, ModelCaller, PromptPayload};
use wayfinder_intent::{ClassifierMode, WorkflowConfig, WorkflowEngine};
use wayfinder_web::{WebConfig, WebServer};

// ── fakes ───────────────────────────────────────────────────────────

struct ScriptedModel {
    fail: bool,
}

#[async_trait]
impl ModelCaller for ScriptedModel {
    async fn generate(&self, _payload: &PromptPayload) -> wayfinder_agent::Result<String> {
        if self.fail {
            return Err(AgentError::LlmRequestFailed {
                reason: "upstream returned 503".into(),
            });
        }
        Ok("## Day 1\n- Morning: Gothic Quarter walk".into())
    }
}

struct StaticKnowledge;

#[async_trait]
impl RetrievalService for StaticKnowledge {
    async fn search(&self, _query: &str, _top_k: usize) -> wayfinder_adapters::Result<Vec<Snippet>> {
        Ok(vec![Snippet::new(
            "The Gothic Quarter is best explored on foot.",
            "barcelona.md",
            0.8,
        )])
    }
}

struct NoWeather;

#[async_trait]
impl WeatherProvider for NoWeather {
    fn id(&self) -> &str {
        "test-weather"
    }

    async fn fetch(&self, location: &str) -> wayfinder_adapters::Result<WeatherRecord> {
        Err(ProviderError::LocationNotFound {
            location: location.into(),
        })
    }
}

struct OnePlace;

#[async_trait]
impl PoiProvider for OnePlace {
    fn id(&self) -> &str {
        "test-poi"
    }

    async fn fetch(&self, _location: &str) -> wayfinder_adapters::Result<Vec<PlaceRecord>> {
        Ok(vec![PlaceRecord::named("Sagrada Familia")])
    }
}

// ── harness ─────────────────────────────────────────────────────────

async fn spawn_server(fail_synthesis: bool) -> SocketAddr {
    let config = WorkflowConfig {
        classifier: ClassifierMode::Keywords,
        provider_timeout_ms: 500,
        ..WorkflowConfig::default()
    };
    let engine = WorkflowEngine::new(
        config,
        Arc::new(ScriptedModel {
            fail: fail_synthesis,
        }),
        Arc::new(StaticKnowledge),
        Arc::new(NoWeather),
        Arc::new(OnePlace),
    )
    .unwrap();

    let server = WebServer::new(WebConfig::default(), Arc::new(engine));
    let router = server.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    addr
}

async fn post_plan(addr: SocketAddr, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("http://{addr}/api/plan"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

// ── tests ───────────────────────────────────────────────────────────

#[test]
fn web_config_defaults() {
    let config = WebConfig::default();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(config.cors_origin, "*");
}

#[tokio::test]
async fn plan_returns_answer_sources_and_confidence() {
    let addr = spawn_server(false).await;
    let (status, body) = post_plan(
        addr,
        json!({ "city": "Barcelona", "days": 1, "preferences": "architecture" }),
    )
    .await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["intent"], "plan");
    assert_eq!(body["city"], "Barcelona");
    assert!(body["plan"].as_str().unwrap().contains("## Day 1"));
    assert_eq!(body["sources"], json!(["barcelona.md", "test-poi"]));
    assert!(body["weather"].is_null());
    assert_eq!(body["pois"][0]["name"], "Sagrada Familia");

    let confidence = body["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence < 1.0);
    assert!(body["request_id"].is_string());
    assert!(body["timings"]["total_ms"].is_u64());
}

#[tokio::test]
async fn invalid_days_is_a_bad_request() {
    let addr = spawn_server(false).await;

    let (status, body) = post_plan(addr, json!({ "city": "Barcelona", "days": 0 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "invalid_input");

    let (status, body) = post_plan(addr, json!({ "city": "Barcelona", "days": 4_294_967_295u64 }))
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("at most 30"));

    let (status, body) = post_plan(addr, json!({ "city": "Barcelona", "days": "three" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "invalid_input");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn model_outage_is_a_bad_gateway() {
    let addr = spawn_server(true).await;
    let (status, body) = post_plan(addr, json!({ "city": "Rome", "days": 2 })).await;
    assert_eq!(status, 502);
    assert_eq!(body["kind"], "upstream_unavailable");
}

#[tokio::test]
async fn status_reports_run_counters() {
    let addr = spawn_server(false).await;
    post_plan(addr, json!({ "city": "Porto", "days": 1 })).await;
    post_plan(addr, json!({ "city": "Porto", "days": -1 })).await;

    let body: Value = reqwest::get(format!("http://{addr}/api/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metrics"]["runs_completed"], 1);
    // Rejected input never starts a run.
    assert_eq!(body["metrics"]["runs_started"], 1);
    assert_eq!(body["metrics"]["weather_degraded"], 1);
    assert_eq!(body["in_flight"], 0);
    assert_eq!(body["metrics"]["latency"]["total"]["count"], 1);
    assert_eq!(body["metrics"]["latency"]["synthesize"]["count"], 1);
    assert!(body["metrics"]["latency"]["fetch"]["mean_ms"].is_number());
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let addr = spawn_server(false).await;
    post_plan(addr, json!({ "city": "Porto", "days": 2 })).await;
    post_plan(addr, json!({ "city": "Porto", "days": 1000 })).await;

    let res = reqwest::get(format!("http://{addr}/api/metrics"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert!(
        res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain; version=0.0.4")
    );
    let text = res.text().await.unwrap();
    assert!(text.contains("wayfinder_runs_started_total 1\n"));
    assert!(text.contains("wayfinder_runs_completed_total 1\n"));
    assert!(text.contains("wayfinder_stage_latency_ms_count{stage=\"total\"} 1\n"));
}

#[tokio::test]
async fn graph_renders_each_format() {
    let addr = spawn_server(false).await;

    let mermaid = reqwest::get(format!("http://{addr}/api/graph"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(mermaid.starts_with("flowchart TD"));

    let json: Value = reqwest::get(format!("http://{addr}/api/graph?format=json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 4);

    let res = reqwest::get(format!("http://{addr}/api/graph?format=svg"))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn health_index_and_unknown_routes() {
    let addr = spawn_server(false).await;

    let health = reqwest::get(format!("http://{addr}/api/health")).await.unwrap();
    assert_eq!(health.status().as_u16(), 200);

    let index = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(index.text().await.unwrap().contains("Wayfinder"));

    let missing = reqwest::get(format!("http://{addr}/api/nope")).await.unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
