//! CLI entry point for Wayfinder.
//!
//! This binary provides the `wayfinder` command: answer a single request,
//! serve the HTTP API, print the workflow graph, inspect the knowledge base,
//! and check configuration.

mod bootstrap;
mod cli;
mod commands;
mod config;
mod helpers;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    helpers::init_tracing(cli.log_level.as_deref().unwrap_or(default_level));

    let (config, source) = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan {
            city,
            days,
            preferences,
            query,
            json,
        } => commands::plan(&config, &city, days, preferences, query, json).await,
        Commands::Serve { bind, port } => commands::serve(&config, bind, port).await,
        Commands::Graph { format } => {
            commands::graph(&config, format);
            Ok(())
        }
        Commands::Kb { action } => commands::kb(&config, action).await,
        Commands::Config { action } => commands::config(&config, source.as_deref(), action),
    }
}
