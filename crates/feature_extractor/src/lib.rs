//! Feature extractor crate for the liver-risk model.
//!
//! This crate turns a 14-day window of wearable metrics and one same-day
//! profile into the two inputs the regressor expects: a `14 x 6` sequence and
//! an 8-wide tabular vector. The column order of every input is fixed here and
//! shared with the scaler artifacts and the training-window builder.

use tracing::debug;

mod error;
pub mod records;
pub mod scaler;
pub mod windows;

pub use error::FeatureError;
pub use records::{
    PredictionRequest, UserDayInput, UserDayProfile, WatchDayInput, WatchDayRecord, WatchWindow,
    gender_numeric,
};
pub use scaler::{FeatureScaler, MinMaxScaler, TargetScaler};

/// Days in the look-back window.
pub const SEQUENCE_LENGTH: usize = 14;

/// Wearable metrics per day.
pub const TIME_SERIES_WIDTH: usize = 6;

/// Width of the tabular input: `gender_numeric` followed by
/// [`TABULAR_FEATURES`].
pub const TABULAR_WIDTH: usize = 8;

/// Columns known to the feature scaler.
pub const FEATURE_COUNT: usize = 16;

/// Regression targets.
pub const TARGET_COUNT: usize = 2;

/// Target columns in model output order.
pub const TARGET_NAMES: [&str; TARGET_COUNT] = ["triglycerides", "ggt"];

/// A column known to the feature scaler.
///
/// Variants are declared in scaler column order, so the discriminant is the
/// column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Age,
    Bmi,
    HasHereditaryRisk,
    Tee,
    CalorieIntake,
    FatGrams,
    CarbsGrams,
    ProteinGrams,
    DailySteps,
    ActiveMinutes,
    SleepHours,
    SleepQualityScore,
    RestingHeartRate,
    HeartRateVariability,
    EnergyBalance,
    CumulativeBalance,
}

impl Feature {
    /// Column name as stored in the scaler artifact.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Bmi => "bmi",
            Self::HasHereditaryRisk => "has_hereditary_risk",
            Self::Tee => "tee",
            Self::CalorieIntake => "calorie_intake",
            Self::FatGrams => "fat_grams",
            Self::CarbsGrams => "carbs_grams",
            Self::ProteinGrams => "protein_grams",
            Self::DailySteps => "daily_steps",
            Self::ActiveMinutes => "active_minutes",
            Self::SleepHours => "sleep_hours",
            Self::SleepQualityScore => "sleep_quality_score",
            Self::RestingHeartRate => "resting_heart_rate",
            Self::HeartRateVariability => "heart_rate_variability",
            Self::EnergyBalance => "energy_balance",
            Self::CumulativeBalance => "cumulative_balance",
        }
    }

    /// Index of this column in a scaler row.
    #[must_use]
    pub const fn column(self) -> usize {
        self as usize
    }
}

/// Every scaler column, in the order the scaler was fit.
pub const SCALER_FEATURES: [Feature; FEATURE_COUNT] = [
    Feature::Age,
    Feature::Bmi,
    Feature::HasHereditaryRisk,
    Feature::Tee,
    Feature::CalorieIntake,
    Feature::FatGrams,
    Feature::CarbsGrams,
    Feature::ProteinGrams,
    Feature::DailySteps,
    Feature::ActiveMinutes,
    Feature::SleepHours,
    Feature::SleepQualityScore,
    Feature::RestingHeartRate,
    Feature::HeartRateVariability,
    Feature::EnergyBalance,
    Feature::CumulativeBalance,
];

/// Sequence input columns.
pub const TIME_SERIES_FEATURES: [Feature; TIME_SERIES_WIDTH] = [
    Feature::DailySteps,
    Feature::ActiveMinutes,
    Feature::SleepHours,
    Feature::SleepQualityScore,
    Feature::RestingHeartRate,
    Feature::HeartRateVariability,
];

/// Scaled tabular columns. The unscaled `gender_numeric` is prepended in the
/// model input.
pub const TABULAR_FEATURES: [Feature; TABULAR_WIDTH - 1] = [
    Feature::Age,
    Feature::Bmi,
    Feature::HasHereditaryRisk,
    Feature::CalorieIntake,
    Feature::FatGrams,
    Feature::CarbsGrams,
    Feature::ProteinGrams,
];

/// Model-ready inputs for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    /// Scaled `[day][metric]` sequence, oldest day first.
    pub sequence: [[f32; TIME_SERIES_WIDTH]; SEQUENCE_LENGTH],
    /// `gender_numeric` followed by the scaled [`TABULAR_FEATURES`].
    pub tabular: [f32; TABULAR_WIDTH],
}

impl ModelInput {
    /// Row-major copy of the sequence, ready to reshape into `[1, 14, 6]`.
    #[must_use]
    pub fn sequence_flat(&self) -> Vec<f32> {
        self.sequence.iter().flatten().copied().collect()
    }
}

/// Lays out one scaler row: the day's wearable metrics plus the profile.
/// Absent scaling-context fields are carried as NaN.
#[must_use]
pub fn raw_feature_row(day: &WatchDayRecord, profile: &UserDayProfile) -> [f64; FEATURE_COUNT] {
    SCALER_FEATURES.map(|feature| match feature {
        Feature::Age => profile.age,
        Feature::Bmi => profile.bmi,
        Feature::HasHereditaryRisk => profile.has_hereditary_risk,
        Feature::Tee => profile.tee.unwrap_or(f64::NAN),
        Feature::CalorieIntake => profile.calorie_intake,
        Feature::FatGrams => profile.fat_grams,
        Feature::CarbsGrams => profile.carbs_grams,
        Feature::ProteinGrams => profile.protein_grams,
        Feature::DailySteps => day.daily_steps,
        Feature::ActiveMinutes => day.active_minutes,
        Feature::SleepHours => day.sleep_hours,
        Feature::SleepQualityScore => day.sleep_quality_score,
        Feature::RestingHeartRate => day.resting_heart_rate,
        Feature::HeartRateVariability => day.heart_rate_variability,
        Feature::EnergyBalance => profile.energy_balance.unwrap_or(f64::NAN),
        Feature::CumulativeBalance => profile.cumulative_balance.unwrap_or(f64::NAN),
    })
}

const fn finite(feature: Feature, value: f64) -> Result<f32, FeatureError> {
    if value.is_finite() {
        Ok(value as f32)
    } else {
        Err(FeatureError::NonFiniteFeature {
            field: feature.name(),
            value,
        })
    }
}

/// Builds the tabular model input from a scaled row.
///
/// # Errors
///
/// Returns [`FeatureError::NonFiniteFeature`] if a selected value is not finite.
pub(crate) fn tabular_input(
    gender_numeric: f64,
    scaled_row: &[f64; FEATURE_COUNT],
) -> Result<[f32; TABULAR_WIDTH], FeatureError> {
    let mut tabular = [0.0_f32; TABULAR_WIDTH];
    tabular[0] = gender_numeric as f32;
    for (slot, feature) in tabular[1..].iter_mut().zip(TABULAR_FEATURES) {
        *slot = finite(feature, scaled_row[feature.column()])?;
    }
    Ok(tabular)
}

/// Builds the time-series model input for one day from a scaled row.
///
/// # Errors
///
/// Returns [`FeatureError::NonFiniteFeature`] if a selected value is not finite.
pub(crate) fn sequence_step(
    scaled_row: &[f64; FEATURE_COUNT],
) -> Result<[f32; TIME_SERIES_WIDTH], FeatureError> {
    let mut step = [0.0_f32; TIME_SERIES_WIDTH];
    for (slot, feature) in step.iter_mut().zip(TIME_SERIES_FEATURES) {
        *slot = finite(feature, scaled_row[feature.column()])?;
    }
    Ok(step)
}

/// Assembles the model inputs.
///
/// The profile is broadcast onto every day, each of the 14 rows is scaled
/// with the same feature scaler, the sequence takes the wearable columns of
/// every row and the tabular vector takes the profile columns of the last
/// row. `gender_numeric` is not scaled.
///
/// # Errors
///
/// Returns [`FeatureError::NonFiniteFeature`] if a value reaching the model
/// is NaN or infinite.
pub fn assemble(
    window: &WatchWindow,
    profile: &UserDayProfile,
    scaler: &FeatureScaler,
) -> Result<ModelInput, FeatureError> {
    let mut sequence = [[0.0_f32; TIME_SERIES_WIDTH]; SEQUENCE_LENGTH];
    let mut last_row = [0.0_f64; FEATURE_COUNT];

    for (step, day) in sequence.iter_mut().zip(window.days()) {
        let scaled_row = scaler.scale(&raw_feature_row(day, profile))?;
        *step = sequence_step(&scaled_row)?;
        last_row = scaled_row;
    }

    let tabular = tabular_input(profile.gender_numeric(), &last_row)?;

    debug!(
        sequence = ?[SEQUENCE_LENGTH, TIME_SERIES_WIDTH],
        tabular = TABULAR_WIDTH,
        "Assembled model inputs"
    );

    Ok(ModelInput { sequence, tabular })
}


#[cfg(test)]
mod tests {
    use super::test_support::{day, doubling_scaler, profile};
    use super::*;

    fn midpoints() -> [f64; FEATURE_COUNT] {
        raw_feature_row(&day(5000.0), &profile("M"))
    }

    #[test]
    fn test_feature_columns_match_declaration_order() {
        for (i, feature) in SCALER_FEATURES.iter().enumerate() {
            assert_eq!(feature.column(), i, "{}", feature.name());
        }
    }

    #[test]
    fn test_assemble_shapes_and_values() {
        let scaler = doubling_scaler(&midpoints());
        let window = WatchWindow::new(vec![day(5000.0); SEQUENCE_LENGTH]).unwrap();

        let input = assemble(&window, &profile("M"), &scaler).unwrap();

        assert_eq!(input.sequence.len(), SEQUENCE_LENGTH);
        assert_eq!(input.sequence_flat().len(), SEQUENCE_LENGTH * TIME_SERIES_WIDTH);
        assert!(input.sequence_flat().iter().all(|&v| (v - 0.5).abs() < 1e-6));

        // gender is raw, everything else is the scaled midpoint
        assert!((input.tabular[0] - 1.0).abs() < f32::EPSILON);
        assert!(input.tabular[1..].iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_sequence_is_chronological() {
        let scaler = doubling_scaler(&midpoints());
        let days: Vec<_> = (0..SEQUENCE_LENGTH).map(|i| day(1000.0 * i as f64)).collect();
        let window = WatchWindow::new(days).unwrap();

        let input = assemble(&window, &profile("F"), &scaler).unwrap();

        // steps column scaled against a max of 10_000
        for (i, step) in input.sequence.iter().enumerate() {
            let expected = (1000.0 * i as f64 / 10_000.0) as f32;
            assert!((step[0] - expected).abs() < 1e-6, "day {i}");
        }
        assert!(input.tabular[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_context_fields_do_not_reach_the_model() {
        let scaler = doubling_scaler(&midpoints());
        let window = WatchWindow::new(vec![day(5000.0); SEQUENCE_LENGTH]).unwrap();
        let mut user = profile("M");
        user.tee = None;
        user.energy_balance = None;
        user.cumulative_balance = None;

        let input = assemble(&window, &user, &scaler).unwrap();
        assert!(input.tabular.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let scaler = doubling_scaler(&midpoints());
        let mut days = vec![day(5000.0); SEQUENCE_LENGTH];
        days[4].sleep_hours = f64::INFINITY;
        let window = WatchWindow::new(days).unwrap();

        let err = assemble(&window, &profile("M"), &scaler).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::NonFiniteFeature {
                field: "sleep_hours",
                ..
            }
        ));
    }

    #[test]
    fn test_tabular_input_takes_profile_columns() {
        let mut row = [0.0_f64; FEATURE_COUNT];
        for feature in TABULAR_FEATURES {
            row[feature.column()] = 0.25;
        }
        row[Feature::DailySteps.column()] = f64::NAN;

        let tabular = tabular_input(1.0, &row).unwrap();

        assert!((tabular[0] - 1.0).abs() < f32::EPSILON);
        assert!(tabular[1..].iter().all(|&v| (v - 0.25).abs() < f32::EPSILON));
        assert!(sequence_step(&row).is_err());
    }
}
