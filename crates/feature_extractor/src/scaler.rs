//! Fitted min-max scaling.
//!
//! The artifact stores the fitted per-column minimum and maximum together
//! with the ordered column names it was fit on, so the column contract can be
//! checked when the artifact is loaded instead of silently corrupting inputs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{FEATURE_COUNT, FeatureError, SCALER_FEATURES, TARGET_COUNT, TARGET_NAMES};

/// Ranges narrower than this are treated as constant columns.
const ZERO_RANGE: f64 = 10.0 * f64::EPSILON;

const fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Per-column min-max normalization fitted on training data.
///
/// `x' = x * scale + offset` with `scale = (hi - lo) / (max - min)` and
/// `offset = lo - min * scale`. Constant columns use a range of 1. Values
/// outside the fitted range extrapolate linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    feature_names: Vec<String>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
    #[serde(default = "default_feature_range")]
    feature_range: (f64, f64),
}

#[expect(
    clippy::suboptimal_flops,
    reason = "unfused arithmetic keeps results identical to the fitting side"
)]
impl MinMaxScaler {
    /// Fits the scaler on `rows`, each holding one value per name.
    /// NaN values are ignored when computing the extrema.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rows, a row has the wrong width, or a
    /// column holds no finite value.
    pub fn fit(names: &[&str], rows: &[Vec<f64>]) -> Result<Self, FeatureError> {
        if rows.is_empty() {
            return Err(FeatureError::ScalerFormat(
                "cannot fit a scaler on zero rows".to_owned(),
            ));
        }

        let width = names.len();
        let mut data_min = vec![f64::INFINITY; width];
        let mut data_max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            if row.len() != width {
                return Err(FeatureError::ScalerShape {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (col, &value) in row.iter().enumerate() {
                if value.is_nan() {
                    continue;
                }
                data_min[col] = data_min[col].min(value);
                data_max[col] = data_max[col].max(value);
            }
        }

        if let Some(col) = data_min.iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::ScalerFormat(format!(
                "column '{}' has no finite values",
                names[col]
            )));
        }

        Ok(Self {
            feature_names: names.iter().map(|&n| n.to_owned()).collect(),
            data_min,
            data_max,
            feature_range: default_feature_range(),
        })
    }

    /// Decodes a scaler artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the parameter vectors
    /// disagree in length.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FeatureError> {
        let scaler: Self =
            serde_json::from_slice(bytes).map_err(|e| FeatureError::ScalerFormat(e.to_string()))?;

        let width = scaler.feature_names.len();
        for len in [scaler.data_min.len(), scaler.data_max.len()] {
            if len != width {
                return Err(FeatureError::ScalerShape {
                    expected: width,
                    actual: len,
                });
            }
        }

        Ok(scaler)
    }

    /// Encodes the scaler as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, FeatureError> {
        serde_json::to_string_pretty(self).map_err(|e| FeatureError::ScalerFormat(e.to_string()))
    }

    /// Column names in fit order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Checks that the scaler was fit on exactly `expected`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::FeatureContract`] on any difference.
    pub fn ensure_features(
        &self,
        artifact: &'static str,
        expected: &[&str],
    ) -> Result<(), FeatureError> {
        if self
            .feature_names
            .iter()
            .map(String::as_str)
            .eq(expected.iter().copied())
        {
            debug!(
                artifact,
                features = expected.len(),
                "Feature contract verified"
            );
            return Ok(());
        }

        Err(FeatureError::FeatureContract {
            artifact,
            expected: expected.iter().map(|&n| n.to_owned()).collect(),
            found: self.feature_names.clone(),
        })
    }

    fn coefficients(&self, col: usize) -> (f64, f64) {
        let (lo, hi) = self.feature_range;
        let range = self.data_max[col] - self.data_min[col];
        let range = if range.abs() < ZERO_RANGE { 1.0 } else { range };
        let scale = (hi - lo) / range;
        (scale, lo - self.data_min[col] * scale)
    }

    fn check_width(&self, actual: usize) -> Result<(), FeatureError> {
        if actual == self.feature_names.len() {
            Ok(())
        } else {
            Err(FeatureError::ScalerShape {
                expected: self.feature_names.len(),
                actual,
            })
        }
    }

    /// Scales one row. NaN passes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::ScalerShape`] if the row has the wrong width.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(col, &x)| {
                let (scale, offset) = self.coefficients(col);
                x * scale + offset
            })
            .collect())
    }

    /// Maps one scaled row back to physical units.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::ScalerShape`] if the row has the wrong width.
    pub fn inverse_transform(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(col, &y)| {
                let (scale, offset) = self.coefficients(col);
                (y - offset) / scale
            })
            .collect())
    }
}

fn into_array<const N: usize>(values: Vec<f64>) -> Result<[f64; N], FeatureError> {
    let actual = values.len();
    <[f64; N]>::try_from(values).map_err(|_| FeatureError::ScalerShape {
        expected: N,
        actual,
    })
}

/// Scaler over the sixteen model features, verified against
/// [`SCALER_FEATURES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler(MinMaxScaler);

impl FeatureScaler {
    /// Name used in contract errors and logs.
    pub const ARTIFACT: &'static str = "feature scaler";

    /// Wraps a fitted scaler after checking its feature contract.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::FeatureContract`] if the scaler was fit on a
    /// different column list.
    pub fn new(scaler: MinMaxScaler) -> Result<Self, FeatureError> {
        let expected = SCALER_FEATURES.map(crate::Feature::name);
        scaler.ensure_features(Self::ARTIFACT, &expected)?;
        Ok(Self(scaler))
    }

    /// Scales one row laid out in [`SCALER_FEATURES`] order.
    ///
    /// # Errors
    ///
    /// Only fails if the wrapped scaler is internally inconsistent.
    pub fn scale(&self, row: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], FeatureError> {
        into_array(self.0.transform(row)?)
    }

    /// The wrapped scaler.
    #[must_use]
    pub const fn inner(&self) -> &MinMaxScaler {
        &self.0
    }
}

/// Scaler over the two regression targets, verified against
/// [`TARGET_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct TargetScaler(MinMaxScaler);

impl TargetScaler {
    /// Name used in contract errors and logs.
    pub const ARTIFACT: &'static str = "target scaler";

    /// Wraps a fitted scaler after checking its target contract.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::FeatureContract`] if the scaler was fit on
    /// different targets or in a different order.
    pub fn new(scaler: MinMaxScaler) -> Result<Self, FeatureError> {
        scaler.ensure_features(Self::ARTIFACT, &TARGET_NAMES)?;
        Ok(Self(scaler))
    }

    /// Physical units to model units.
    ///
    /// # Errors
    ///
    /// Only fails if the wrapped scaler is internally inconsistent.
    pub fn scale_targets(
        &self,
        targets: [f64; TARGET_COUNT],
    ) -> Result<[f64; TARGET_COUNT], FeatureError> {
        into_array(self.0.transform(&targets)?)
    }

    /// Model units back to physical units.
    ///
    /// # Errors
    ///
    /// Only fails if the wrapped scaler is internally inconsistent.
    pub fn inverse_scale(
        &self,
        scaled: [f64; TARGET_COUNT],
    ) -> Result<[f64; TARGET_COUNT], FeatureError> {
        into_array(self.0.inverse_transform(&scaled)?)
    }

    /// The wrapped scaler.
    #[must_use]
    pub const fn inner(&self) -> &MinMaxScaler {
        &self.0
    }
}
