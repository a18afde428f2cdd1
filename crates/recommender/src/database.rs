//! Nutrition reference table.

use serde::Deserialize;
use tracing::{debug, info};

use crate::RecommendError;

/// One food in the reference table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NutritionRecord {
    pub food_name: String,
    pub energy_kcal: f64,
    pub fat_g: f64,
    pub protein_g: f64,
}

/// Row shape on disk. Numeric cells may be blank or unparsable; such rows are
/// dropped at load.
#[derive(Debug, Deserialize)]
struct RawRow {
    food_name: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    energy_kcal: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    fat_g: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    protein_g: Option<f64>,
}

impl RawRow {
    fn complete(self) -> Option<NutritionRecord> {
        Some(NutritionRecord {
            food_name: self.food_name,
            energy_kcal: self.energy_kcal?,
            fat_g: self.fat_g?,
            protein_g: self.protein_g?,
        })
    }
}

/// Read-only food table, kept in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionDatabase {
    records: Vec<NutritionRecord>,
}

impl NutritionDatabase {
    /// Parses a CSV table with a header row. Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RecommendError::Database`] if the CSV is malformed or lacks
    /// one of the required columns.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, RecommendError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut records = Vec::new();
        let mut dropped = 0_usize;

        for row in reader.deserialize::<RawRow>() {
            let row = row.map_err(|e| RecommendError::Database(e.to_string()))?;
            match row.complete() {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(dropped, "Dropped nutrition rows with missing values");
        }
        info!(rows = records.len(), "Loaded nutrition database");

        Ok(Self { records })
    }

    #[must_use]
    pub const fn from_records(records: Vec<NutritionRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NutritionRecord> {
        self.records.iter()
    }
}
