//! Inference seam between the prediction pipeline and a fitted model.

use std::sync::Mutex;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use feature_extractor::{
    ModelInput, SEQUENCE_LENGTH, TABULAR_WIDTH, TARGET_COUNT, TIME_SERIES_WIDTH,
};
use tracing::{debug, info};

use crate::{RiskModel, RiskModelConfig, RiskModelRecord};

/// CPU backend used for serving.
pub type InferenceBackend = burn::backend::NdArray;

/// Failure to load or run the fitted model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid model config: {0}")]
    Config(String),

    #[error("failed to load model record: {0}")]
    Record(String),

    #[error("unexpected model output: {0}")]
    Output(String),

    #[error("model lock poisoned by an earlier panic")]
    Poisoned,
}

/// A fitted regressor: given the assembled inputs, returns the two scaled
/// targets. Implementations must be deterministic.
pub trait RiskRegressor: Send + Sync {
    /// Runs inference for one sample.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or produces the wrong shape.
    fn predict(&self, input: &ModelInput) -> Result<[f32; TARGET_COUNT], ModelError>;
}

/// [`RiskRegressor`] backed by a Burn [`RiskModel`].
#[derive(Debug)]
pub struct BurnRegressor<B: Backend> {
    // Burn modules are `Send` but not `Sync`
    model: Mutex<RiskModel<B>>,
    device: B::Device,
}

impl<B: Backend> BurnRegressor<B> {
    /// Wraps an already built model.
    pub const fn new(model: RiskModel<B>, device: B::Device) -> Self {
        Self {
            model: Mutex::new(model),
            device,
        }
    }

    /// Restores a fitted model from its config JSON and named `MessagePack`
    /// record.
    ///
    /// # Arguments
    ///
    /// * `config_bytes` - Serialized [`RiskModelConfig`].
    /// * `record_bytes` - Weights written by `NamedMpkBytesRecorder`.
    /// * `device` - The device to load the model to.
    ///
    /// # Errors
    ///
    /// Returns an error if either artifact cannot be decoded or the record
    /// does not match the configured architecture.
    pub fn from_bytes(
        config_bytes: &[u8],
        record_bytes: Vec<u8>,
        device: &B::Device,
    ) -> Result<Self, ModelError> {
        let config = RiskModelConfig::load_binary(config_bytes)
            .map_err(|e| ModelError::Config(e.to_string()))?;

        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record: RiskModelRecord<B> = Recorder::<B>::load(&recorder, record_bytes, device)
            .map_err(|e| ModelError::Record(e.to_string()))?;

        let model = config.init::<B>(device).load_record(record);

        info!(
            lstm_hidden = config.lstm_hidden,
            head_hidden = config.head_hidden,
            "Loaded risk model"
        );

        Ok(Self::new(model, device.clone()))
    }

    /// Serializes the current weights with the recorder [`Self::from_bytes`]
    /// reads.
    ///
    /// # Errors
    ///
    /// Returns an error if recording fails.
    pub fn record_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let model = self.model.lock().map_err(|_| ModelError::Poisoned)?.clone();
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        Recorder::<B>::record(&recorder, model.into_record(), ())
            .map_err(|e| ModelError::Record(e.to_string()))
    }
}

impl<B: Backend> RiskRegressor for BurnRegressor<B> {
    fn predict(&self, input: &ModelInput) -> Result<[f32; TARGET_COUNT], ModelError> {
        let sequence = Tensor::<B, 1>::from_floats(input.sequence_flat().as_slice(), &self.device)
            .reshape([1, SEQUENCE_LENGTH, TIME_SERIES_WIDTH]);
        let tabular = Tensor::<B, 1>::from_floats(input.tabular.as_slice(), &self.device)
            .reshape([1, TABULAR_WIDTH]);

        let output = self
            .model
            .lock()
            .map_err(|_| ModelError::Poisoned)?
            .forward(sequence, tabular);
        debug!(dims = ?output.dims(), "Model forward pass complete");

        let values: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| ModelError::Output(format!("{e:?}")))?;

        let actual = values.len();
        <[f32; TARGET_COUNT]>::try_from(values).map_err(|_| {
            ModelError::Output(format!("expected {TARGET_COUNT} values, got {actual}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    use super::*;

    type TestBackend = NdArray;

    fn input() -> ModelInput {
        ModelInput {
            sequence: [[0.5; TIME_SERIES_WIDTH]; SEQUENCE_LENGTH],
            tabular: [1.0, 0.2, 0.4, 1.0, 0.6, 0.5, 0.7, 0.3],
        }
    }

    fn regressor() -> BurnRegressor<TestBackend> {
        let device = NdArrayDevice::default();
        let model = RiskModelConfig::new().init::<TestBackend>(&device);
        BurnRegressor::new(model, device)
    }

    #[test]
    fn test_predict_returns_two_finite_values() {
        let prediction = regressor().predict(&input()).unwrap();
        assert!(prediction.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_predict_is_deterministic() {
        let regressor = regressor();
        let first = regressor.predict(&input()).unwrap();
        let second = regressor.predict(&input()).unwrap();
        assert_eq!(first.map(f32::to_bits), second.map(f32::to_bits));
    }

    #[test]
    fn test_concurrent_predictions_agree() {
        let regressor = regressor();
        let expected = regressor.predict(&input()).unwrap().map(f32::to_bits);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| regressor.predict(&input()).unwrap().map(f32::to_bits)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });

        // the lock is free again once every prediction has returned
        assert!(regressor.model.try_lock().is_ok());
    }

    #[test]
    fn test_record_round_trip() {
        let device = NdArrayDevice::default();
        let original = regressor();
        let config_bytes = serde_json::to_vec(&RiskModelConfig::new()).unwrap();
        let record_bytes = original.record_bytes().unwrap();

        let restored =
            BurnRegressor::<TestBackend>::from_bytes(&config_bytes, record_bytes, &device).unwrap();

        let before = original.predict(&input()).unwrap();
        let after = restored.predict(&input()).unwrap();
        assert_eq!(before.map(f32::to_bits), after.map(f32::to_bits));
    }

    #[test]
    fn test_rejects_garbage_record() {
        let device = NdArrayDevice::default();
        let config_bytes = serde_json::to_vec(&RiskModelConfig::new()).unwrap();
        let result =
            BurnRegressor::<TestBackend>::from_bytes(&config_bytes, vec![1, 2, 3], &device);
        assert!(matches!(result, Err(ModelError::Record(_))));
    }

    #[test]
    fn test_rejects_bad_config() {
        let device = NdArrayDevice::default();
        let result = BurnRegressor::<TestBackend>::from_bytes(b"not json", Vec::new(), &device);
        assert!(matches!(result, Err(ModelError::Config(_))));
    }
}
