//! Recommend command - generates a meal recommendation for one payload.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::{ArtifactStore, Config};
use recommender::GeminiGenerator;
use tracing::info;

use super::predict::{emit, read_payload};
use crate::RecommendationContext;
use crate::api::handle_recommendation;

/// Runs the recommend command.
///
/// # Arguments
///
/// * `config` - Application configuration, including the generator key
/// * `input` - Path to a `{user_context, original_meal}` JSON payload
///
/// # Errors
///
/// Returns an error if the generator is not configured, the nutrition table
/// cannot be loaded, or the request fails.
pub async fn run(config: &Config, input: &Path) -> Result<()> {
    info!(
        input = %input.display(),
        model = %config.generator.model,
        "Generating meal recommendation"
    );

    let generator =
        GeminiGenerator::new(&config.generator).context("Failed to configure text generator")?;

    let store = ArtifactStore::open(&config.artifact_base_path)?;
    let context = RecommendationContext::load(&store, &config.artifacts, Arc::new(generator))
        .await
        .context("Failed to load nutrition database")?;

    let payload = read_payload(input)?;
    emit(&handle_recommendation(&context, &payload).await)
}
