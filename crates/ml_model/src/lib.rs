//! ML model crate for triglyceride and GGT prediction.
//!
//! This crate uses the Burn deep learning framework to define and run
//! inference with a two-branch network: an LSTM reads the 14-day wearable
//! sequence, an MLP reads the same-day profile, and a small head fuses both
//! into the two scaled blood markers.

use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig, Relu};
use burn::prelude::*;
use feature_extractor::{TABULAR_WIDTH, TARGET_COUNT, TIME_SERIES_WIDTH};

mod regressor;

pub use regressor::{BurnRegressor, InferenceBackend, ModelError, RiskRegressor};

/// Configuration for the risk model.
#[derive(Config, Debug)]
pub struct RiskModelConfig {
    /// Hidden units of the sequence branch.
    #[config(default = 64)]
    pub lstm_hidden: usize,
    /// Hidden units of the first tabular layer.
    #[config(default = 32)]
    pub mlp_hidden_1: usize,
    /// Hidden units of the second tabular layer.
    #[config(default = 16)]
    pub mlp_hidden_2: usize,
    /// Hidden units of the fusion head.
    #[config(default = 32)]
    pub head_hidden: usize,
    /// Dropout after each branch.
    #[config(default = 0.2)]
    pub branch_dropout: f64,
    /// Dropout inside the head.
    #[config(default = 0.3)]
    pub head_dropout: f64,
}

impl RiskModelConfig {
    /// Creates a freshly initialized model on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> RiskModel<B> {
        RiskModel {
            lstm: LstmConfig::new(TIME_SERIES_WIDTH, self.lstm_hidden, true).init(device),
            lstm_dropout: DropoutConfig::new(self.branch_dropout).init(),
            dense1: LinearConfig::new(TABULAR_WIDTH, self.mlp_hidden_1).init(device),
            dense2: LinearConfig::new(self.mlp_hidden_1, self.mlp_hidden_2).init(device),
            mlp_dropout: DropoutConfig::new(self.branch_dropout).init(),
            head: LinearConfig::new(self.lstm_hidden + self.mlp_hidden_2, self.head_hidden)
                .init(device),
            head_dropout: DropoutConfig::new(self.head_dropout).init(),
            output: LinearConfig::new(self.head_hidden, TARGET_COUNT).init(device),
            activation: Relu::new(),
        }
    }
}

/// The multimodal risk model.
#[derive(Module, Debug)]
pub struct RiskModel<B: Backend> {
    lstm: Lstm<B>,
    lstm_dropout: Dropout,
    dense1: Linear<B>,
    dense2: Linear<B>,
    mlp_dropout: Dropout,
    head: Linear<B>,
    head_dropout: Dropout,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> RiskModel<B> {
    /// Forward pass through the network.
    ///
    /// # Arguments
    ///
    /// * `sequence` - Tensor of shape [`batch_size`, 14, 6]
    /// * `tabular` - Tensor of shape [`batch_size`, 8]
    ///
    /// # Returns
    ///
    /// Tensor of shape [`batch_size`, 2] holding scaled triglycerides and GGT.
    pub fn forward(&self, sequence: Tensor<B, 3>, tabular: Tensor<B, 2>) -> Tensor<B, 2> {
        // Only the final hidden state of the sequence branch is used
        let (_, state) = self.lstm.forward(sequence, None);
        let temporal = self.lstm_dropout.forward(state.hidden);

        let x = self.activation.forward(self.dense1.forward(tabular));
        let x = self.activation.forward(self.dense2.forward(x));
        let profile = self.mlp_dropout.forward(x);

        let fused = Tensor::cat(vec![temporal, profile], 1);
        let x = self.activation.forward(self.head.forward(fused));
        let x = self.head_dropout.forward(x);
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use feature_extractor::SEQUENCE_LENGTH;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn test_model_creation() {
        let device = Default::default();
        let config = RiskModelConfig::new();
        let _model: RiskModel<TestBackend> = config.init(&device);
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: RiskModel<TestBackend> = RiskModelConfig::new().init(&device);

        let sequence =
            Tensor::<TestBackend, 3>::zeros([3, SEQUENCE_LENGTH, TIME_SERIES_WIDTH], &device);
        let tabular = Tensor::<TestBackend, 2>::ones([3, TABULAR_WIDTH], &device);

        let output = model.forward(sequence, tabular);
        assert_eq!(output.dims(), [3, TARGET_COUNT]);
    }

    #[test]
    fn test_config_defaults() {
        let config = RiskModelConfig::new();
        assert_eq!(config.lstm_hidden, 64);
        assert_eq!(config.mlp_hidden_2, 16);
        assert!(config.head_dropout > config.branch_dropout);
    }
}
