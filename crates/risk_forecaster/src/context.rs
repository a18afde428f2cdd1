//! Process-wide artifacts, loaded once before any request is served.

use std::sync::Arc;

use burn::backend::ndarray::NdArrayDevice;
use config::{ArtifactPaths, ArtifactStore};
use feature_extractor::{FeatureScaler, MinMaxScaler, TargetScaler};
use ml_model::{BurnRegressor, InferenceBackend, RiskRegressor};
use recommender::{NutritionDatabase, TextGenerator};
use tracing::info;

use crate::ServiceError;

/// Everything a prediction needs. Read-only after construction.
pub struct PredictionContext {
    feature_scaler: FeatureScaler,
    target_scaler: TargetScaler,
    regressor: Box<dyn RiskRegressor>,
}

impl PredictionContext {
    #[must_use]
    pub const fn new(
        feature_scaler: FeatureScaler,
        target_scaler: TargetScaler,
        regressor: Box<dyn RiskRegressor>,
    ) -> Self {
        Self {
            feature_scaler,
            target_scaler,
            regressor,
        }
    }

    /// Loads both scalers and the model from the artifact store.
    ///
    /// Each scaler is checked against the expected feature layout, so a
    /// context that loads is safe to serve.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ArtifactMissing`] if an artifact is absent,
    /// [`ServiceError::FeatureContract`] if a scaler was fit on other columns,
    /// or [`ServiceError::Artifact`] if an artifact cannot be decoded.
    pub async fn load(
        store: &ArtifactStore,
        paths: &ArtifactPaths,
        device: &NdArrayDevice,
    ) -> Result<Self, ServiceError> {
        let feature_bytes = store.read(&paths.feature_scaler).await?;
        let feature_scaler = FeatureScaler::new(MinMaxScaler::from_json(&feature_bytes)?)?;
        let target_bytes = store.read(&paths.target_scaler).await?;
        let target_scaler = TargetScaler::new(MinMaxScaler::from_json(&target_bytes)?)?;
        info!(
            features = feature_scaler.inner().feature_names().len(),
            targets = target_scaler.inner().feature_names().len(),
            "Scalers match the expected feature layout"
        );

        let config_bytes = store.read(&paths.model_config).await?;
        let record_bytes = store.read(&paths.model_record).await?.to_vec();
        let regressor =
            BurnRegressor::<InferenceBackend>::from_bytes(&config_bytes, record_bytes, device)?;

        info!(base_path = %store.base_path().display(), "Prediction artifacts loaded");

        Ok(Self::new(feature_scaler, target_scaler, Box::new(regressor)))
    }

    #[must_use]
    pub const fn feature_scaler(&self) -> &FeatureScaler {
        &self.feature_scaler
    }

    #[must_use]
    pub const fn target_scaler(&self) -> &TargetScaler {
        &self.target_scaler
    }

    #[must_use]
    pub fn regressor(&self) -> &dyn RiskRegressor {
        self.regressor.as_ref()
    }
}

/// Everything a recommendation needs. Read-only after construction.
pub struct RecommendationContext {
    database: NutritionDatabase,
    generator: Arc<dyn TextGenerator>,
}

impl RecommendationContext {
    #[must_use]
    pub const fn new(database: NutritionDatabase, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            database,
            generator,
        }
    }

    /// Loads the nutrition table from the artifact store.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ArtifactMissing`] if the table is absent or
    /// [`ServiceError::Artifact`] if it cannot be parsed.
    pub async fn load(
        store: &ArtifactStore,
        paths: &ArtifactPaths,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, ServiceError> {
        let database = NutritionDatabase::from_csv(&store.read(&paths.nutrition_db).await?)?;
        Ok(Self::new(database, generator))
    }

    #[must_use]
    pub const fn database(&self) -> &NutritionDatabase {
        &self.database
    }

    #[must_use]
    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use ml_model::RiskModelConfig;

    use super::*;
    use crate::predict::predict_payload;
    use crate::test_support::{EchoGenerator, feature_scaler, prediction_payload, target_scaler};

    fn write_prediction_artifacts(dir: &Path, paths: &ArtifactPaths) {
        let device = NdArrayDevice::default();
        let model = RiskModelConfig::new().init::<InferenceBackend>(&device);
        let regressor = BurnRegressor::new(model, device);

        std::fs::write(
            dir.join(&paths.model_config),
            serde_json::to_vec(&RiskModelConfig::new()).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join(&paths.model_record),
            regressor.record_bytes().unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join(&paths.feature_scaler),
            feature_scaler().inner().to_json().unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join(&paths.target_scaler),
            target_scaler().inner().to_json().unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_and_predict_from_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::default();
        write_prediction_artifacts(dir.path(), &paths);

        let store = ArtifactStore::open(dir.path()).unwrap();
        let context = PredictionContext::load(&store, &paths, &NdArrayDevice::default())
            .await
            .unwrap();

        let result = predict_payload(&context, &prediction_payload(14)).unwrap();
        assert!(result.predicted_triglycerides.is_finite());
        assert!(result.predicted_ggt.is_finite());
    }

    #[tokio::test]
    async fn test_missing_artifact_refuses_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::default();
        write_prediction_artifacts(dir.path(), &paths);
        std::fs::remove_file(dir.path().join(&paths.model_record)).unwrap();

        let store = ArtifactStore::open(dir.path()).unwrap();
        let result = PredictionContext::load(&store, &paths, &NdArrayDevice::default()).await;

        assert!(matches!(result, Err(ServiceError::ArtifactMissing { .. })));
    }

    #[tokio::test]
    async fn test_swapped_scalers_violate_the_contract() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::default();
        write_prediction_artifacts(dir.path(), &paths);
        // target scaler stored where the feature scaler belongs
        std::fs::copy(
            dir.path().join(&paths.target_scaler),
            dir.path().join(&paths.feature_scaler),
        )
        .unwrap();

        let store = ArtifactStore::open(dir.path()).unwrap();
        let result = PredictionContext::load(&store, &paths, &NdArrayDevice::default()).await;

        assert!(matches!(result, Err(ServiceError::FeatureContract(_))));
    }

    #[tokio::test]
    async fn test_load_nutrition_database() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::default();
        std::fs::write(
            dir.path().join(&paths.nutrition_db),
            "food_name,energy_kcal,fat_g,protein_g\nChicken Salad,450,20,24\nDal,,5,7\n",
        )
        .unwrap();

        let store = ArtifactStore::open(dir.path()).unwrap();
        let generator = Arc::new(EchoGenerator { fail: false });
        let context = RecommendationContext::load(&store, &paths, generator)
            .await
            .unwrap();

        assert_eq!(context.database().len(), 1);
    }
}
