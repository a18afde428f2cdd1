//! Errors raised while validating, scaling and assembling model inputs.

/// Failure to turn raw request data into model-ready inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    /// A collection had the wrong number of records.
    #[error("{what} must contain exactly {expected} record(s), but got {actual}")]
    InvalidInputShape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A member of the request had the wrong JSON type.
    #[error("{field} is malformed: {message}")]
    Malformed { field: String, message: String },

    /// A required field was absent from a record.
    #[error("{record} is missing required field '{field}'")]
    MissingFeature { record: String, field: &'static str },

    /// A value that reaches the model was NaN or infinite.
    #[error("feature '{field}' must be a finite number, got {value}")]
    NonFiniteFeature { field: &'static str, value: f64 },

    /// A fitted scaler was fit on a different column set or order.
    #[error("{artifact} was fit on features {found:?}, expected {expected:?}")]
    FeatureContract {
        artifact: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A scaler's parameter vectors or an input row had the wrong width.
    #[error("scaler expects {expected} values, got {actual}")]
    ScalerShape { expected: usize, actual: usize },

    /// A scaler artifact could not be decoded.
    #[error("invalid scaler artifact: {0}")]
    ScalerFormat(String),
}
