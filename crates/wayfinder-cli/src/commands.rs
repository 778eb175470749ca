//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use wayfinder_adapters::RetrievalService;
use wayfinder_intent::graph::{self, GraphFormat};
use wayfinder_intent::{ErrorKind, TripPlan};
use wayfinder_web::{WebConfig, WebServer};

use crate::bootstrap;
use crate::cli::{ConfigAction, GraphFormatArg, KbAction};
use crate::config::AppConfig;
use crate::helpers::{env_non_empty, mask_secret};

/// Width of the rule under the plan header.
const RULE_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

pub async fn plan(
    config: &AppConfig,
    city: &str,
    days: i64,
    preferences: Option<String>,
    query: Option<String>,
    json: bool,
) -> Result<()> {
    let engine = bootstrap::build_engine(config)?;

    let plan = match engine.plan(city, days, preferences, query).await {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("  Error: {e}");
            std::process::exit(exit_code(e.kind()));
        }
    };
    tracing::debug!(metrics = %engine.metrics(), "run metrics");

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidInput => 2,
        ErrorKind::UpstreamUnavailable => 3,
        ErrorKind::TimedOut => 4,
        ErrorKind::Internal => 1,
    }
}

/// Human-readable rendering of a finished run.
pub fn render_plan(plan: &TripPlan) -> String {
    let mut out = String::new();
    let day_word = if plan.days == 1 { "day" } else { "days" };
    out.push_str(&format!(
        "\n  {} | {} {day_word} | intent: {}\n",
        plan.city, plan.days, plan.intent
    ));
    if let Some(prefs) = &plan.preferences {
        out.push_str(&format!("  preferences: {prefs}\n"));
    }
    out.push_str(&format!("  {}\n\n", "-".repeat(RULE_WIDTH)));

    for line in plan.response.lines() {
        out.push_str(&format!("  {line}\n"));
    }
    out.push('\n');

    match &plan.weather {
        Some(weather) => out.push_str(&format!("  Weather:    {}\n", weather.summary())),
        None => out.push_str("  Weather:    unavailable\n"),
    }

    if plan.pois.is_empty() {
        out.push_str("  Places:     unavailable\n");
    } else {
        out.push_str("  Places:\n");
        for place in &plan.pois {
            match &place.category {
                Some(category) => out.push_str(&format!("    - {} ({category})\n", place.name)),
                None => out.push_str(&format!("    - {}\n", place.name)),
            }
        }
    }

    if plan.sources.is_empty() {
        out.push_str("  Sources:    none\n");
    } else {
        out.push_str(&format!("  Sources:    {}\n", plan.sources.join(", ")));
    }
    out.push_str(&format!(
        "  Confidence: {:.2} ({} ms)\n\n",
        plan.confidence, plan.timings.total_ms
    ));
    out
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

pub async fn serve(config: &AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let mut web = WebConfig::from(&config.web);
    if let Some(bind) = bind {
        web.bind_addr = bind;
    }
    if let Some(port) = port {
        web.port = port;
    }

    let engine = Arc::new(bootstrap::build_engine(config)?);
    let server = WebServer::new(web, engine);
    info!(addr = %server.addr(), "serving wayfinder");
    println!("  Wayfinder listening on http://{}", server.addr());

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("web server failed: {e}"))
}

// ---------------------------------------------------------------------------
// graph
// ---------------------------------------------------------------------------

pub fn graph(config: &AppConfig, format: GraphFormatArg) {
    let format = match format {
        GraphFormatArg::Mermaid => GraphFormat::Mermaid,
        GraphFormatArg::Ascii => GraphFormat::Ascii,
        GraphFormatArg::Json => GraphFormat::Json,
    };
    println!("{}", graph::render(&config.workflow, format));
}

// ---------------------------------------------------------------------------
// kb
// ---------------------------------------------------------------------------

pub async fn kb(config: &AppConfig, action: KbAction) -> Result<()> {
    let kb = bootstrap::load_knowledge(config)?;

    match action {
        KbAction::Stats => {
            println!();
            println!("  Knowledge base: {}", config.knowledge.dir.display());
            println!("    Files:  {}", kb.file_count());
            println!("    Chunks: {}", kb.len());
            println!();
        }
        KbAction::Search { query, limit } => {
            let results = kb.search(&query, limit).await?;
            if results.is_empty() {
                println!("  No matches for '{query}'.");
                return Ok(());
            }
            for (i, snippet) in results.iter().enumerate() {
                println!(
                    "  {}. [{:.3}] {}\n     {}\n",
                    i + 1,
                    snippet.score,
                    snippet.source_id,
                    preview(&snippet.text, 160)
                );
            }
        }
    }
    Ok(())
}

/// First `max` characters on one line.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}...")
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

pub fn config(config: &AppConfig, source: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml().context("failed to render configuration")?);
        }
        ConfigAction::Check => {
            config.validate()?;
            let variable = config.llm.key_variable()?;
            println!();
            match source {
                Some(path) => println!("  Config:   OK ({})", path.display()),
                None => println!("  Config:   defaults (no file)"),
            }
            println!("  Provider: {} ({})", config.llm.provider, config.llm.model);
            match env_non_empty(&variable) {
                Some(key) => println!("  API key:  {variable} = {}", mask_secret(&key)),
                None => println!("  API key:  {variable} NOT SET"),
            }
            let kb_state = if config.knowledge.dir.is_dir() { "OK" } else { "MISSING" };
            println!("  Knowledge: {} ({kb_state})", config.knowledge.dir.display());
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use wayfinder_adapters::{PlaceRecord, Snippet};
    use wayfinder_intent::{Intent, StageTimings};

    use super::*;

    fn sample_plan() -> TripPlan {
        TripPlan {
            request_id: uuid::Uuid::nil(),
            city: "Barcelona".into(),
            days: 2,
            preferences: Some("food".into()),
            user_query: "Plan 2 days in Barcelona".into(),
            intent: Intent::Plan,
            response: "## Day 1\n- Tapas in El Born".into(),
            sources: vec!["barcelona.md".into(), "openstreetmap".into()],
            confidence: 0.712,
            weather: None,
            pois: vec![PlaceRecord {
                category: Some("museum".into()),
                ..PlaceRecord::named("Museu Picasso")
            }],
            snippets: vec![Snippet::new("Tapas", "barcelona.md", 0.9)],
            timings: StageTimings::default(),
        }
    }

    #[test]
    fn renders_plan_sections() {
        let text = render_plan(&sample_plan());
        assert!(text.contains("Barcelona | 2 days | intent: plan"));
        assert!(text.contains("  ## Day 1"));
        assert!(text.contains("Weather:    unavailable"));
        assert!(text.contains("- Museu Picasso (museum)"));
        assert!(text.contains("Sources:    barcelona.md, openstreetmap"));
        assert!(text.contains("Confidence: 0.71"));
    }

    #[test]
    fn exit_codes_distinguish_failures() {
        assert_eq!(exit_code(ErrorKind::InvalidInput), 2);
        assert_eq!(exit_code(ErrorKind::UpstreamUnavailable), 3);
        assert_eq!(exit_code(ErrorKind::TimedOut), 4);
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n\nb", 10), "a b");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
    }
}
