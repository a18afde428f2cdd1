//! Typed request records and their validation.
//!
//! Raw inputs arrive as loosely typed JSON. Every field is optional at the
//! wire level so that a missing field can be reported by name instead of as a
//! generic decoding failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FeatureError, SEQUENCE_LENGTH, TIME_SERIES_WIDTH};

/// One day of wearable metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchDayRecord {
    pub daily_steps: f64,
    pub active_minutes: f64,
    pub sleep_hours: f64,
    pub sleep_quality_score: f64,
    pub resting_heart_rate: f64,
    pub heart_rate_variability: f64,
}

impl WatchDayRecord {
    /// Returns the metrics in the time-series column order.
    #[must_use]
    pub const fn values(&self) -> [f64; TIME_SERIES_WIDTH] {
        [
            self.daily_steps,
            self.active_minutes,
            self.sleep_hours,
            self.sleep_quality_score,
            self.resting_heart_rate,
            self.heart_rate_variability,
        ]
    }
}

/// Exactly [`SEQUENCE_LENGTH`] days of wearable metrics, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchWindow {
    days: [WatchDayRecord; SEQUENCE_LENGTH],
}

impl WatchWindow {
    /// Builds a window, rejecting any other number of days.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidInputShape`] unless exactly
    /// [`SEQUENCE_LENGTH`] days are given.
    pub fn new(days: Vec<WatchDayRecord>) -> Result<Self, FeatureError> {
        let actual = days.len();
        let days = <[WatchDayRecord; SEQUENCE_LENGTH]>::try_from(days).map_err(|_| {
            FeatureError::InvalidInputShape {
                what: "watch_data",
                expected: SEQUENCE_LENGTH,
                actual,
            }
        })?;

        Ok(Self { days })
    }

    /// Days in chronological order.
    #[must_use]
    pub const fn days(&self) -> &[WatchDayRecord; SEQUENCE_LENGTH] {
        &self.days
    }
}

/// Same-day static and dietary attributes of the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDayProfile {
    pub age: f64,
    pub gender: String,
    pub bmi: f64,
    pub has_hereditary_risk: f64,
    /// Total energy expenditure. Scaling context only.
    pub tee: Option<f64>,
    pub calorie_intake: f64,
    pub fat_grams: f64,
    pub carbs_grams: f64,
    pub protein_grams: f64,
    /// Scaling context only.
    pub energy_balance: Option<f64>,
    /// Scaling context only.
    pub cumulative_balance: Option<f64>,
}

impl UserDayProfile {
    /// `1.0` for `"M"`, `0.0` for anything else.
    #[must_use]
    pub fn gender_numeric(&self) -> f64 {
        gender_numeric(&self.gender)
    }
}

/// Maps the categorical gender to the numeric model input.
#[must_use]
pub fn gender_numeric(gender: &str) -> f64 {
    if gender == "M" { 1.0 } else { 0.0 }
}

/// Wire form of a [`WatchDayRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchDayInput {
    pub daily_steps: Option<f64>,
    pub active_minutes: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub sleep_quality_score: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub heart_rate_variability: Option<f64>,
}

/// Hereditary risk may be sent as a boolean or as a 0/1 number.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RiskFlag {
    Flag(bool),
    Value(f64),
}

impl RiskFlag {
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Flag(true) => 1.0,
            Self::Flag(false) => 0.0,
            Self::Value(value) => value,
        }
    }
}

/// Wire form of a [`UserDayProfile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDayInput {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub bmi: Option<f64>,
    pub has_hereditary_risk: Option<RiskFlag>,
    pub tee: Option<f64>,
    pub calorie_intake: Option<f64>,
    pub fat_grams: Option<f64>,
    pub carbs_grams: Option<f64>,
    pub protein_grams: Option<f64>,
    pub energy_balance: Option<f64>,
    pub cumulative_balance: Option<f64>,
}

fn require<T>(value: Option<T>, record: &str, field: &'static str) -> Result<T, FeatureError> {
    value.ok_or_else(|| FeatureError::MissingFeature {
        record: record.to_owned(),
        field,
    })
}

impl WatchDayInput {
    /// Validates that every metric is present.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingFeature`] naming the first absent field.
    pub fn validate(self, record: &str) -> Result<WatchDayRecord, FeatureError> {
        Ok(WatchDayRecord {
            daily_steps: require(self.daily_steps, record, "daily_steps")?,
            active_minutes: require(self.active_minutes, record, "active_minutes")?,
            sleep_hours: require(self.sleep_hours, record, "sleep_hours")?,
            sleep_quality_score: require(self.sleep_quality_score, record, "sleep_quality_score")?,
            resting_heart_rate: require(self.resting_heart_rate, record, "resting_heart_rate")?,
            heart_rate_variability: require(
                self.heart_rate_variability,
                record,
                "heart_rate_variability",
            )?,
        })
    }
}

impl UserDayInput {
    /// Validates that every model input is present. The scaling-context
    /// fields (`tee`, `energy_balance`, `cumulative_balance`) stay optional.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingFeature`] naming the first absent field.
    pub fn validate(self, record: &str) -> Result<UserDayProfile, FeatureError> {
        Ok(UserDayProfile {
            age: require(self.age, record, "age")?,
            gender: require(self.gender, record, "gender")?,
            bmi: require(self.bmi, record, "bmi")?,
            has_hereditary_risk: require(self.has_hereditary_risk, record, "has_hereditary_risk")?
                .as_f64(),
            tee: self.tee,
            calorie_intake: require(self.calorie_intake, record, "calorie_intake")?,
            fat_grams: require(self.fat_grams, record, "fat_grams")?,
            carbs_grams: require(self.carbs_grams, record, "carbs_grams")?,
            protein_grams: require(self.protein_grams, record, "protein_grams")?,
            energy_balance: self.energy_balance,
            cumulative_balance: self.cumulative_balance,
        })
    }
}

/// A decoded prediction request, not yet validated.
#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    pub watch_data: Vec<WatchDayInput>,
    /// Normally a single record; a list is accepted and must hold exactly one.
    pub user_data: Vec<UserDayInput>,
}

fn decode<T: DeserializeOwned>(value: &Value, field: String) -> Result<T, FeatureError> {
    T::deserialize(value).map_err(|e| FeatureError::Malformed {
        field,
        message: e.to_string(),
    })
}

impl PredictionRequest {
    /// Decodes the `watch_data` and `user_data` members of a payload.
    ///
    /// Absent members decode as empty and are rejected by [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Malformed`] when a member has the wrong JSON type.
    pub fn from_json(payload: &Value) -> Result<Self, FeatureError> {
        let watch_data = match payload.get("watch_data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(days)) => days
                .iter()
                .enumerate()
                .map(|(i, day)| decode(day, format!("watch_data[{i}]")))
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(FeatureError::Malformed {
                    field: "watch_data".to_owned(),
                    message: "expected an array of daily records".to_owned(),
                });
            }
        };

        let user_data = match payload.get("user_data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(rows)) => rows
                .iter()
                .enumerate()
                .map(|(i, row)| decode(row, format!("user_data[{i}]")))
                .collect::<Result<_, _>>()?,
            Some(row) => vec![decode(row, "user_data".to_owned())?],
        };

        Ok(Self {
            watch_data,
            user_data,
        })
    }

    /// Checks cardinalities first, then required fields.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidInputShape`] or
    /// [`FeatureError::MissingFeature`].
    pub fn validate(self) -> Result<(WatchWindow, UserDayProfile), FeatureError> {
        if self.watch_data.len() != SEQUENCE_LENGTH {
            return Err(FeatureError::InvalidInputShape {
                what: "watch_data",
                expected: SEQUENCE_LENGTH,
                actual: self.watch_data.len(),
            });
        }

        let [user] = <[UserDayInput; 1]>::try_from(self.user_data).map_err(|rows| {
            FeatureError::InvalidInputShape {
                what: "user_data",
                expected: 1,
                actual: rows.len(),
            }
        })?;

        let days = self
            .watch_data
            .into_iter()
            .enumerate()
            .map(|(i, day)| day.validate(&format!("watch_data[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((WatchWindow::new(days)?, user.validate("user_data")?))
    }
}
