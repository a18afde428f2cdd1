//! Keyword and threshold retrieval of healthier alternatives.
//!
//! A candidate must mention the meal's leading word and beat it on
//! calories, fat and protein by fixed ratios. Results keep database order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{NutritionDatabase, NutritionRecord, RecommendError};

/// Alternatives returned when the caller does not ask for a count.
pub const DEFAULT_TOP_N: usize = 3;

/// Candidates must have at most this share of the meal's calories.
pub const MAX_CALORIE_RATIO: f64 = 0.8;

/// Candidates must have at most this share of the meal's fat.
pub const MAX_FAT_RATIO: f64 = 0.8;

/// Candidates must keep at least this share of the meal's protein.
pub const MIN_PROTEIN_RATIO: f64 = 0.9;

/// A meal the user consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub name: String,
    pub calories: f64,
    pub fat: f64,
    pub protein: f64,
}

/// Returns up to `top_n` foods that share the meal's leading word and are
/// lighter in calories and fat without losing much protein.
///
/// # Errors
///
/// Returns [`RecommendError::EmptyMealName`] if the meal name has no words
/// and the database is not empty.
pub fn retrieve_alternatives<'db>(
    meal: &MealEntry,
    database: &'db NutritionDatabase,
    top_n: usize,
) -> Result<Vec<&'db NutritionRecord>, RecommendError> {
    if database.is_empty() {
        return Ok(Vec::new());
    }

    let ingredient = meal
        .name
        .split_whitespace()
        .next()
        .ok_or(RecommendError::EmptyMealName)?
        .to_lowercase();

    let max_calories = meal.calories * MAX_CALORIE_RATIO;
    let max_fat = meal.fat * MAX_FAT_RATIO;
    let min_protein = meal.protein * MIN_PROTEIN_RATIO;

    let alternatives: Vec<_> = database
        .iter()
        .filter(|food| {
            food.food_name.to_lowercase().contains(&ingredient)
                && food.energy_kcal <= max_calories
                && food.fat_g <= max_fat
                && food.protein_g >= min_protein
        })
        .take(top_n)
        .collect();

    debug!(
        ingredient,
        max_calories,
        max_fat,
        min_protein,
        matches = alternatives.len(),
        "Retrieved alternatives"
    );

    Ok(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(name: &str, kcal: f64, fat: f64, protein: f64) -> NutritionRecord {
        NutritionRecord {
            food_name: name.to_owned(),
            energy_kcal: kcal,
            fat_g: fat,
            protein_g: protein,
        }
    }

    fn biryani() -> MealEntry {
        MealEntry {
            name: "Chicken Biryani".to_owned(),
            calories: 600.0,
            fat: 30.0,
            protein: 25.0,
        }
    }

    fn count(db: &NutritionDatabase) -> usize {
        retrieve_alternatives(&biryani(), db, 3).unwrap().len()
    }

    #[test]
    fn test_chicken_biryani_matches_only_chicken_salad() {
        let db = NutritionDatabase::from_records(vec![
            food("Chicken Salad", 450.0, 20.0, 24.0),
            food("Beef Curry", 400.0, 15.0, 30.0),
        ]);

        let found = retrieve_alternatives(&biryani(), &db, DEFAULT_TOP_N).unwrap();

        let names: Vec<_> = found.iter().map(|r| r.food_name.as_str()).collect();
        assert_eq!(names, ["Chicken Salad"]);
    }

    #[test]
    fn test_empty_database_returns_nothing() {
        let db = NutritionDatabase::default();
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        // exactly 480 kcal, 24 g fat, 22.5 g protein
        let db = NutritionDatabase::from_records(vec![food("chicken tikka", 480.0, 24.0, 22.5)]);
        assert_eq!(count(&db), 1);

        let db = NutritionDatabase::from_records(vec![food("chicken tikka", 480.1, 24.0, 22.5)]);
        assert_eq!(count(&db), 0);

        let db = NutritionDatabase::from_records(vec![food("chicken tikka", 480.0, 24.0, 22.4)]);
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_substring_match_is_case_insensitive_and_keeps_order() {
        let db = NutritionDatabase::from_records(vec![
            food("Grilled CHICKEN breast", 200.0, 5.0, 30.0),
            food("Tandoori chicken", 300.0, 10.0, 28.0),
            food("Chickenpea mix", 250.0, 8.0, 26.0),
            food("Chicken soup", 150.0, 4.0, 23.0),
        ]);

        let found = retrieve_alternatives(&biryani(), &db, 3).unwrap();

        let names: Vec<_> = found.iter().map(|r| r.food_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Grilled CHICKEN breast",
                "Tandoori chicken",
                "Chickenpea mix",
            ]
        );
    }

    #[test]
    fn test_empty_meal_name_is_rejected() {
        let db = NutritionDatabase::from_records(vec![food("Chicken Salad", 450.0, 20.0, 24.0)]);
        let meal = MealEntry {
            name: "   ".to_owned(),
            ..biryani()
        };

        assert!(matches!(
            retrieve_alternatives(&meal, &db, 3),
            Err(RecommendError::EmptyMealName)
        ));
    }
}
