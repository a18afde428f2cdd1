//! Predict command - scores one prediction payload with the fitted model.

use std::path::Path;

use anyhow::{Context, Result};
use config::{ArtifactStore, Config};
use serde_json::Value;
use tracing::info;

use super::init_device;
use crate::PredictionContext;
use crate::api::{ApiResponse, handle_prediction};

/// Reads a JSON file into a value.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not JSON.
pub fn read_payload(input: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", input.display()))
}

/// Prints the response body and fails on a 4xx or 5xx status.
///
/// # Errors
///
/// Returns an error if the response is not a success.
pub fn emit(response: &ApiResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if !response.is_success() {
        anyhow::bail!("Request failed with status {}", response.status);
    }
    Ok(())
}

/// Runs the predict command.
///
/// # Arguments
///
/// * `config` - Application configuration
/// * `input` - Path to a `{watch_data, user_data}` JSON payload
///
/// # Errors
///
/// Returns an error if the artifacts cannot be loaded or the request fails.
pub async fn run(config: &Config, input: &Path) -> Result<()> {
    info!(
        input = %input.display(),
        artifacts = %config.artifact_base_path.display(),
        "Predicting liver-risk markers"
    );

    let store = ArtifactStore::open(&config.artifact_base_path)?;
    let device = init_device();
    let context = PredictionContext::load(&store, &config.artifacts, &device)
        .await
        .context("Failed to load prediction artifacts")?;

    let payload = read_payload(input)?;
    emit(&handle_prediction(&context, &payload))
}
