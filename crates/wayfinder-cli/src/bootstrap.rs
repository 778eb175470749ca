//! Wire the production collaborators into a [`WorkflowEngine`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use wayfinder_adapters::{KnowledgeBase, OpenMeteoWeather, OverpassPoi};
use wayfinder_agent::LlmClient;
use wayfinder_intent::WorkflowEngine;

use crate::config::AppConfig;

/// Load the knowledge base; a missing directory yields an empty base so
/// requests still run, ungrounded.
pub fn load_knowledge(config: &AppConfig) -> Result<KnowledgeBase> {
    let dir = &config.knowledge.dir;
    if !dir.is_dir() {
        warn!(
            dir = %dir.display(),
            "knowledge directory not found, answers will not be grounded"
        );
        return Ok(KnowledgeBase::new());
    }
    KnowledgeBase::from_dir(dir)
        .with_context(|| format!("failed to load knowledge base from {}", dir.display()))
}

pub fn weather_provider(config: &AppConfig) -> OpenMeteoWeather {
    let p = &config.providers;
    let mut weather = OpenMeteoWeather::new();
    if let Some(url) = &p.geocoding_url {
        weather = weather.with_geocoding_url(url);
    }
    if let Some(url) = &p.forecast_url {
        weather = weather.with_forecast_url(url);
    }
    if let Some(retries) = p.weather_retries {
        weather = weather.with_max_retries(retries);
    }
    weather
}

pub fn poi_provider(config: &AppConfig) -> OverpassPoi {
    let p = &config.providers;
    let mut poi = OverpassPoi::new();
    if let Some(url) = &p.overpass_url {
        poi = poi.with_endpoint(url);
    }
    if let Some(retries) = p.poi_retries {
        poi = poi.with_max_retries(retries);
    }
    poi
}

/// Build the engine from configuration.
pub fn build_engine(config: &AppConfig) -> Result<WorkflowEngine> {
    let llm_config = config.llm_client_config()?;
    let provider = llm_config.provider;
    let llm = LlmClient::new(llm_config).context("failed to create LLM client")?;
    let knowledge = load_knowledge(config)?;

    info!(
        provider = provider.as_str(),
        model = %config.llm.model,
        chunks = knowledge.len(),
        classifier = ?config.workflow.classifier,
        "workflow engine ready"
    );

    let engine = WorkflowEngine::new(
        config.workflow.clone(),
        Arc::new(llm),
        Arc::new(knowledge),
        Arc::new(weather_provider(config)),
        Arc::new(poi_provider(config)),
    )?;
    Ok(engine)
}
