//! Check-artifacts command - loads everything a server would need at startup.

use anyhow::{Context, Result};
use config::{ArtifactStore, Config};
use recommender::NutritionDatabase;
use tracing::info;

use super::init_device;
use crate::PredictionContext;

/// Loads the scalers, the model and the nutrition table, and verifies the
/// feature contract of both scalers.
///
/// # Errors
///
/// Returns an error naming the first artifact that is missing or invalid.
pub async fn run(config: &Config) -> Result<()> {
    let store = ArtifactStore::open(&config.artifact_base_path)?;
    let device = init_device();

    let context = PredictionContext::load(&store, &config.artifacts, &device)
        .await
        .context("Prediction artifacts are not usable")?;

    let database = NutritionDatabase::from_csv(&store.read(&config.artifacts.nutrition_db).await?)
        .context("Nutrition database is not usable")?;

    info!(
        features = context.feature_scaler().inner().feature_names().len(),
        targets = context.target_scaler().inner().feature_names().len(),
        foods = database.len(),
        "All artifacts loaded"
    );

    if config.generator.api_key.is_none() {
        info!("GEMINI_API_KEY is not set; the recommend command will not run");
    }

    Ok(())
}
