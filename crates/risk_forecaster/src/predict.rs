//! Prediction facade: validation, assembly, inference and inverse scaling.

use feature_extractor::{PredictionRequest, UserDayProfile, WatchWindow, assemble};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{PredictionContext, ServiceError};

/// Predicted blood markers in physical units, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// mg/dL
    pub predicted_triglycerides: f64,
    /// U/L
    pub predicted_ggt: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Predicts both markers for a validated window and profile.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] if a value reaching the model is not
/// finite, or a server-side error if inference or inverse scaling fails.
pub fn predict(
    context: &PredictionContext,
    window: &WatchWindow,
    profile: &UserDayProfile,
) -> Result<PredictionResult, ServiceError> {
    let input = assemble(window, profile, context.feature_scaler())?;

    let scaled = context.regressor().predict(&input)?;
    debug!(?scaled, "Model output");

    let [triglycerides, ggt] = context
        .target_scaler()
        .inverse_scale(scaled.map(f64::from))
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    if !triglycerides.is_finite() || !ggt.is_finite() {
        return Err(ServiceError::Internal(format!(
            "model produced non-finite output {scaled:?}"
        )));
    }

    let result = PredictionResult {
        predicted_triglycerides: round2(triglycerides),
        predicted_ggt: round2(ggt),
    };

    info!(
        triglycerides = result.predicted_triglycerides,
        ggt = result.predicted_ggt,
        "Prediction complete"
    );

    Ok(result)
}

/// Decodes, validates and predicts a raw prediction payload.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] if the payload is malformed, has the
/// wrong number of records or lacks a required field. The model is never
/// called in that case.
pub fn predict_payload(
    context: &PredictionContext,
    payload: &Value,
) -> Result<PredictionResult, ServiceError> {
    let (window, profile) = PredictionRequest::from_json(payload)?.validate()?;
    predict(context, &window, &profile)
}
