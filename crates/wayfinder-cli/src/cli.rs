//! CLI argument definitions for Wayfinder.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Wayfinder -- grounded travel answers from knowledge, weather and places.
#[derive(Parser)]
#[command(
    name = "wayfinder",
    version,
    about = "Wayfinder -- travel planning assistant",
    long_about = "Classifies a travel request, retrieves reference knowledge, fetches live \
                  weather and points of interest, and synthesizes an answer with a \
                  confidence score."
)]
pub struct Cli {
    /// Path to the TOML configuration file (default: ./wayfinder.toml if present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (default: info for serve, warn otherwise).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer one travel request and print the result.
    Plan {
        /// Destination city.
        #[arg(long)]
        city: String,

        /// Trip length in days.
        #[arg(long, allow_negative_numbers = true)]
        days: i64,

        /// Travel preferences, e.g. "art, food".
        #[arg(long)]
        preferences: Option<String>,

        /// Free-form question; defaults to a plan request for the trip.
        #[arg(long, short)]
        query: Option<String>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API with the embedded trip form.
    Serve {
        /// Address to bind the HTTP server to (overrides [web] bind_addr).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides [web] port).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the workflow graph.
    Graph {
        #[arg(long, short, value_enum, default_value_t = GraphFormatArg::Mermaid)]
        format: GraphFormatArg,
    },

    /// Inspect the knowledge base.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Show or validate the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GraphFormatArg {
    Mermaid,
    Ascii,
    Json,
}

/// Actions for the knowledge base.
#[derive(Subcommand)]
pub enum KbAction {
    /// Count indexed files and chunks.
    Stats,
    /// Run an ad-hoc similarity search.
    Search {
        /// Search text.
        query: String,
        /// Maximum number of results.
        #[arg(long, short, default_value_t = 5)]
        limit: usize,
    },
}

/// Actions for configuration.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Validate the configuration and report where the API key comes from.
    Check,
}
