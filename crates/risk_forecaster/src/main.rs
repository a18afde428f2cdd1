//! Liver-risk forecaster
//!
//! Predicts triglycerides and GGT from wearable data and generates
//! healthier-meal recommendations.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use risk_forecaster::commands;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Liver-risk forecaster
#[derive(Parser)]
#[command(name = "risk-forecaster")]
#[command(about = "Predicts liver-risk blood markers and recommends healthier meals")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Artifact directory (overrides `ARTIFACT_BASE_PATH`)
    #[arg(short, long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict triglycerides and GGT for a JSON payload
    Predict {
        /// Path to a `{watch_data, user_data}` JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Recommend a healthier alternative to a logged meal
    Recommend {
        /// Path to a `{user_context, original_meal}` JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Load every artifact and verify the feature contract
    CheckArtifacts,

    /// Fit the feature and target scalers on labelled history
    FitScalers {
        /// CSV of labelled daily history
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for the scaler artifacts
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::from_env()?;
    if let Some(artifacts) = cli.artifacts {
        config.artifact_base_path = artifacts;
    }

    match cli.command {
        Commands::Predict { input } => {
            commands::predict::run(&config, &input).await?;
        }
        Commands::Recommend { input } => {
            commands::recommend::run(&config, &input).await?;
        }
        Commands::CheckArtifacts => {
            commands::check_artifacts::run(&config).await?;
            info!("Artifacts are ready to serve");
        }
        Commands::FitScalers { data, out } => {
            let windows = commands::fit_scalers::run(&data, &out, &config.artifacts)?;
            info!(windows, "Scalers fitted");
        }
    }

    Ok(())
}
