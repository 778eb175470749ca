//! Self-description of the workflow pipeline.
//!
//! The description is generated from [`Stage::ALL`] and the active
//! [`WorkflowConfig`], so the rendered diagrams always match what the
//! engine actually runs.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use crate::config::{ClassifierMode, WorkflowConfig};
use crate::error::{Result, WorkflowError};
use crate::state::Stage;

/// One pipeline node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescription {
    pub id: &'static str,
    pub kind: &'static str,
    pub description: String,
    pub inputs: Vec<&'static str>,
    pub outputs: Vec<&'static str>,
    /// Whether failure degrades (true) or fails the request (false).
    pub degrades: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parallel: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeDescription {
    pub from: &'static str,
    pub to: &'static str,
}

/// Nodes, edges and state schema of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDescription {
    pub name: &'static str,
    pub version: &'static str,
    pub nodes: Vec<NodeDescription>,
    pub edges: Vec<EdgeDescription>,
    pub state_schema: Vec<(&'static str, &'static str)>,
}

const STATE_SCHEMA: [(&str, &str); 11] = [
    ("city", "string"),
    ("days", "integer > 0"),
    ("preferences", "string?"),
    ("user_query", "string"),
    ("intent", "plan | info | events | book"),
    ("retrieved_context", "[snippet]"),
    ("weather_data", "weather | absent"),
    ("poi_data", "[place]"),
    ("response", "string"),
    ("sources", "[string]"),
    ("confidence", "float in [0, 1]"),
];

fn node(stage: Stage, config: &WorkflowConfig) -> NodeDescription {
    match stage {
        Stage::Classify => NodeDescription {
            id: "classify_intent",
            kind: "llm",
            description: match config.classifier {
                ClassifierMode::Model => format!(
                    "Classify intent with {} at temperature 0; falls back to plan",
                    config.classification_model
                ),
                ClassifierMode::Keywords => "Classify intent with keyword rules".into(),
            },
            inputs: vec!["user_query", "city"],
            outputs: vec!["intent"],
            degrades: true,
            parallel: Vec::new(),
        },
        Stage::Retrieve => NodeDescription {
            id: "retrieve_knowledge",
            kind: "retriever",
            description: format!(
                "Expanded similarity search, top {} above {:.2}",
                config.top_k, config.score_threshold
            ),
            inputs: vec!["user_query", "city", "intent", "preferences"],
            outputs: vec!["retrieved_context"],
            degrades: true,
            parallel: Vec::new(),
        },
        Stage::Fetch => NodeDescription {
            id: "fetch_realtime_data",
            kind: "tool",
            description: format!(
                "Weather and points of interest, concurrently, {} ms each",
                config.provider_timeout_ms
            ),
            inputs: vec!["city"],
            outputs: vec!["weather_data", "poi_data"],
            degrades: true,
            parallel: vec!["weather", "poi"],
        },
        Stage::Synthesize => NodeDescription {
            id: "synthesize_response",
            kind: "llm",
            description: format!(
                "Intent-specific answer with {}, confidence scoring",
                config.synthesis_model
            ),
            inputs: vec![
                "intent",
                "retrieved_context",
                "weather_data",
                "poi_data",
                "city",
                "days",
                "preferences",
            ],
            outputs: vec!["response", "sources", "confidence"],
            degrades: false,
            parallel: Vec::new(),
        },
    }
}

pub fn describe(config: &WorkflowConfig) -> GraphDescription {
    let nodes: Vec<NodeDescription> = Stage::ALL.iter().map(|s| node(*s, config)).collect();

    let mut ids = vec!["START"];
    ids.extend(nodes.iter().map(|n| n.id));
    ids.push("END");
    let edges = ids
        .windows(2)
        .map(|w| EdgeDescription { from: w[0], to: w[1] })
        .collect();

    GraphDescription {
        name: "wayfinder",
        version: env!("CARGO_PKG_VERSION"),
        nodes,
        edges,
        state_schema: STATE_SCHEMA.to_vec(),
    }
}

/// Mermaid flowchart source.
pub fn mermaid(graph: &GraphDescription) -> String {
    let mut out = String::from("flowchart TD\n    START([START])\n");
    for node in &graph.nodes {
        let _ = writeln!(out, "    {}[{}]", node.id, node.id);
        for branch in &node.parallel {
            let _ = writeln!(out, "    {} -.-> {}_{branch}[{branch}]", node.id, node.id);
        }
    }
    out.push_str("    END([END])\n");
    for edge in &graph.edges {
        let _ = writeln!(out, "    {} --> {}", edge.from, edge.to);
    }
    out
}

/// Plain-text box diagram.
pub fn ascii(graph: &GraphDescription) -> String {
    const WIDTH: usize = 24;
    let mut out = String::from("[START]\n   |\n   v\n");
    for node in &graph.nodes {
        let border = "-".repeat(WIDTH);
        let _ = writeln!(out, "+{border}+");
        let _ = writeln!(out, "| {:<w$} |", node.id, w = WIDTH - 2);
        let mode = if node.degrades { "degrades" } else { "fatal" };
        let _ = write!(out, "| {:<w$} |", format!("({}, {mode})", node.kind), w = WIDTH - 2);
        if !node.parallel.is_empty() {
            let _ = write!(out, " ==> {}", node.parallel.join(" | "));
        }
        out.push('\n');
        let _ = writeln!(out, "+{border}+");
        out.push_str("   |\n   v\n");
    }
    out.push_str("[END]\n");
    out
}

/// Output format for the graph command and endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphFormat {
    #[default]
    Mermaid,
    Ascii,
    Json,
}

impl FromStr for GraphFormat {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mermaid" => Ok(Self::Mermaid),
            "ascii" | "text" => Ok(Self::Ascii),
            "json" => Ok(Self::Json),
            other => Err(WorkflowError::invalid(format!(
                "unknown graph format `{other}` (expected mermaid, ascii or json)"
            ))),
        }
    }
}

/// Render in the requested format.
pub fn render(config: &WorkflowConfig, format: GraphFormat) -> String {
    let graph = describe(config);
    match format {
        GraphFormat::Mermaid => mermaid(&graph),
        GraphFormat::Ascii => ascii(&graph),
        GraphFormat::Json => serde_json::to_string_pretty(&graph).unwrap_or_default(),
    }
}
