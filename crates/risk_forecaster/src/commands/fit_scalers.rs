//! Fit-scalers command - fits both scalers on labelled history.

use std::path::Path;

use anyhow::{Context, Result};
use config::ArtifactPaths;
use feature_extractor::SEQUENCE_LENGTH;
use feature_extractor::windows::{LabelledDay, build_training_windows, fit_scalers};
use tracing::info;

/// Reads labelled daily rows from a CSV file with a header row.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is malformed.
pub fn read_labelled_days(path: &Path) -> Result<Vec<LabelledDay>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize::<LabelledDay>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Invalid row {} in {}", i + 1, path.display())))
        .collect()
}

/// Runs the fit-scalers command.
///
/// # Arguments
///
/// * `data` - CSV of labelled daily history
/// * `out_dir` - Directory the scaler artifacts are written to
/// * `paths` - Artifact file names
///
/// # Returns
///
/// The number of training windows the history yields.
///
/// # Errors
///
/// Returns an error if the data cannot be read, the scalers cannot be fit, or
/// the artifacts cannot be written.
pub fn run(data: &Path, out_dir: &Path, paths: &ArtifactPaths) -> Result<usize> {
    let days = read_labelled_days(data)?;
    info!(rows = days.len(), data = %data.display(), "Loaded labelled history");

    let (feature_scaler, target_scaler) = fit_scalers(&days)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for (name, json) in [
        (&paths.feature_scaler, feature_scaler.inner().to_json()?),
        (&paths.target_scaler, target_scaler.inner().to_json()?),
    ] {
        let path = out_dir.join(name);
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote scaler");
    }

    let windows = build_training_windows(&days, &feature_scaler, &target_scaler, SEQUENCE_LENGTH)?;
    info!(windows = windows.len(), "Training windows available");

    Ok(windows.len())
}
