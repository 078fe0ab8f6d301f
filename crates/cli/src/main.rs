//! Sleep Disorder Predictor CLI
//!
//! A command-line tool for requesting predictions, checking service health
//! and inspecting derived features offline.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{features, predict, status};
use service_lib::PredictionRequest;
use std::path::PathBuf;

/// Sleep Disorder Predictor CLI
#[derive(Parser)]
#[command(name = "sdp")]
#[command(author, version, about = "CLI for the Sleep Disorder Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SDP_API_URL env var or the config file)
    #[arg(long, env = "SDP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request a prediction for a JSON request file
    Predict {
        /// Request file, or `-` for stdin
        #[arg(long)]
        file: PathBuf,
    },

    /// Validate a request locally and show its derived features
    Features {
        /// Request file, or `-` for stdin
        #[arg(long)]
        file: PathBuf,
    },

    /// Show service greeting and health
    Status,

    /// Print a sample prediction request
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);

    match cli.command {
        Commands::Predict { file } => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            predict::predict(&client, &file, format).await?;
        }
        Commands::Features { file } => {
            features::show_features(&file, format)?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            status::show_status(&client, format).await?;
        }
        Commands::Example => {
            output::print_json(&PredictionRequest::example())?;
        }
    }

    Ok(())
}
