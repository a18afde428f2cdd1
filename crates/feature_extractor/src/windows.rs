//! Sliding training windows over labelled daily history.
//!
//! Each window pairs `sequence_length` consecutive days of wearable metrics
//! with the profile and blood markers of the following day. Windows use the
//! same column layout as [`crate::assemble`].

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    FEATURE_COUNT, FeatureError, FeatureScaler, MinMaxScaler, SCALER_FEATURES, TABULAR_WIDTH,
    TARGET_COUNT, TARGET_NAMES, TIME_SERIES_WIDTH, TargetScaler, UserDayProfile, WatchDayRecord,
    raw_feature_row, sequence_step, tabular_input,
};

/// One labelled day of a user's history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelledDay {
    pub user_id: String,
    /// ISO-8601 date; lexical order is chronological order.
    pub date: String,
    pub gender: String,
    pub age: f64,
    pub bmi: f64,
    pub has_hereditary_risk: f64,
    pub tee: f64,
    pub calorie_intake: f64,
    pub fat_grams: f64,
    pub carbs_grams: f64,
    pub protein_grams: f64,
    pub daily_steps: f64,
    pub active_minutes: f64,
    pub sleep_hours: f64,
    pub sleep_quality_score: f64,
    pub resting_heart_rate: f64,
    pub heart_rate_variability: f64,
    pub energy_balance: f64,
    pub cumulative_balance: f64,
    pub triglycerides: f64,
    pub ggt: f64,
}

impl LabelledDay {
    #[must_use]
    pub const fn watch_day(&self) -> WatchDayRecord {
        WatchDayRecord {
            daily_steps: self.daily_steps,
            active_minutes: self.active_minutes,
            sleep_hours: self.sleep_hours,
            sleep_quality_score: self.sleep_quality_score,
            resting_heart_rate: self.resting_heart_rate,
            heart_rate_variability: self.heart_rate_variability,
        }
    }

    #[must_use]
    pub fn profile(&self) -> UserDayProfile {
        UserDayProfile {
            age: self.age,
            gender: self.gender.clone(),
            bmi: self.bmi,
            has_hereditary_risk: self.has_hereditary_risk,
            tee: Some(self.tee),
            calorie_intake: self.calorie_intake,
            fat_grams: self.fat_grams,
            carbs_grams: self.carbs_grams,
            protein_grams: self.protein_grams,
            energy_balance: Some(self.energy_balance),
            cumulative_balance: Some(self.cumulative_balance),
        }
    }

    /// Raw values in scaler column order.
    #[must_use]
    pub fn feature_row(&self) -> [f64; FEATURE_COUNT] {
        raw_feature_row(&self.watch_day(), &self.profile())
    }

    /// Raw targets in [`TARGET_NAMES`] order.
    #[must_use]
    pub const fn targets(&self) -> [f64; TARGET_COUNT] {
        [self.triglycerides, self.ggt]
    }
}

/// One supervised example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingWindow {
    pub user_id: String,
    /// Scaled wearable metrics, oldest day first.
    pub sequence: Vec<[f32; TIME_SERIES_WIDTH]>,
    /// Model tabular input for the day after the sequence.
    pub tabular: [f32; TABULAR_WIDTH],
    /// Scaled targets for the day after the sequence.
    pub targets: [f32; TARGET_COUNT],
}

/// Fits the feature and target scalers on the full history.
///
/// # Errors
///
/// Returns an error if `days` is empty or a column has no finite values.
pub fn fit_scalers(days: &[LabelledDay]) -> Result<(FeatureScaler, TargetScaler), FeatureError> {
    let feature_rows: Vec<Vec<f64>> = days.iter().map(|d| d.feature_row().to_vec()).collect();
    let target_rows: Vec<Vec<f64>> = days.iter().map(|d| d.targets().to_vec()).collect();

    let names = SCALER_FEATURES.map(crate::Feature::name);
    let feature_scaler = FeatureScaler::new(MinMaxScaler::fit(&names, &feature_rows)?)?;
    let target_scaler = TargetScaler::new(MinMaxScaler::fit(&TARGET_NAMES, &target_rows)?)?;

    info!(rows = days.len(), "Fitted feature and target scalers");

    Ok((feature_scaler, target_scaler))
}

/// Builds every training window from labelled history.
///
/// Days are grouped by user and sorted by date. Users with fewer than
/// `sequence_length` days are skipped. A user with `n` days yields
/// `n - sequence_length` windows.
///
/// # Errors
///
/// Returns [`FeatureError::NonFiniteFeature`] if a selected value is not finite.
pub fn build_training_windows(
    days: &[LabelledDay],
    feature_scaler: &FeatureScaler,
    target_scaler: &TargetScaler,
    sequence_length: usize,
) -> Result<Vec<TrainingWindow>, FeatureError> {
    let mut by_user: BTreeMap<&str, Vec<&LabelledDay>> = BTreeMap::new();
    for day in days {
        by_user.entry(day.user_id.as_str()).or_default().push(day);
    }

    let mut windows = Vec::new();

    for (user_id, mut history) in by_user {
        if history.len() < sequence_length {
            debug!(
                user_id,
                days = history.len(),
                "Skipping user with short history"
            );
            continue;
        }
        history.sort_by(|a, b| a.date.cmp(&b.date));

        let scaled = history
            .iter()
            .map(|day| feature_scaler.scale(&day.feature_row()))
            .collect::<Result<Vec<_>, _>>()?;
        let steps = scaled
            .iter()
            .map(sequence_step)
            .collect::<Result<Vec<_>, _>>()?;

        for start in 0..history.len() - sequence_length {
            let label = start + sequence_length;
            let targets = target_scaler.scale_targets(history[label].targets())?;
            let gender = history[label].profile().gender_numeric();

            windows.push(TrainingWindow {
                user_id: user_id.to_owned(),
                sequence: steps[start..label].to_vec(),
                tabular: tabular_input(gender, &scaled[label])?,
                targets: targets.map(|t| t as f32),
            });
        }
    }

    info!(
        windows = windows.len(),
        sequence_length,
        "Built training windows"
    );

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(user_id: &str, day: u32, steps: f64) -> LabelledDay {
        LabelledDay {
            user_id: user_id.to_owned(),
            date: format!("2024-01-{day:02}"),
            gender: "F".to_owned(),
            age: 40.0,
            bmi: 25.0,
            has_hereditary_risk: 0.0,
            tee: 2200.0,
            calorie_intake: 2000.0,
            fat_grams: 70.0,
            carbs_grams: 250.0,
            protein_grams: 90.0,
            daily_steps: steps,
            active_minutes: 40.0,
            sleep_hours: 7.5,
            sleep_quality_score: 85.0,
            resting_heart_rate: 60.0,
            heart_rate_variability: 55.0,
            energy_balance: -200.0,
            cumulative_balance: 1000.0,
            triglycerides: 100.0 + f64::from(day),
            ggt: 20.0 + f64::from(day),
        }
    }

    #[test]
    fn test_window_counts_per_user() {
        let mut days: Vec<_> = (1..=20)
            .map(|d| labelled("a", d, 1000.0 * f64::from(d)))
            .collect();
        days.extend((1..=10).map(|d| labelled("b", d, 500.0)));

        let (features, targets) = fit_scalers(&days).unwrap();
        let windows = build_training_windows(&days, &features, &targets, 14).unwrap();

        // user "a": 20 - 14 windows, user "b" is too short
        assert_eq!(windows.len(), 6);
        assert!(windows.iter().all(|w| w.user_id == "a"));
        assert!(windows.iter().all(|w| w.sequence.len() == 14));
    }

    #[test]
    fn test_windows_are_sorted_by_date() {
        // insert days out of order
        let mut days: Vec<_> = (1..=16)
            .rev()
            .map(|d| labelled("a", d, f64::from(d)))
            .collect();
        days.push(labelled("z", 1, 0.0));

        let (features, targets) = fit_scalers(&days).unwrap();
        let windows = build_training_windows(&days, &features, &targets, 14).unwrap();

        assert_eq!(windows.len(), 2);
        let first = &windows[0];
        let steps: Vec<f32> = first.sequence.iter().map(|s| s[0]).collect();
        assert!(steps.windows(2).all(|pair| pair[0] < pair[1]));

        // label of the first window is day 15: tg 115 within fitted [101, 116]
        let expected = (115.0 - 101.0) / (116.0 - 101.0);
        assert!((first.targets[0] - expected as f32).abs() < 1e-6);
    }

    #[test]
    fn test_tabular_layout_matches_inference() {
        let days: Vec<_> = (1..=15).map(|d| labelled("a", d, 1.0)).collect();
        let (features, targets) = fit_scalers(&days).unwrap();
        let windows = build_training_windows(&days, &features, &targets, 14).unwrap();

        // gender "F" maps to 0 in the first slot
        assert_eq!(windows.len(), 1);
        assert!(windows[0].tabular[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_requires_rows() {
        assert!(fit_scalers(&[]).is_err());
    }
}
