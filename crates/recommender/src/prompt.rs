//! Recommendation prompt rendering.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{MealEntry, NutritionRecord};

/// Rendered in place of the alternatives list when nothing matched.
pub const NO_ALTERNATIVES_FALLBACK: &str = "No direct alternatives found in our database.";

/// Risk context of the user the recommendation is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Predicted triglycerides in mg/dL.
    pub predicted_tg: f64,
    /// Daily calorie target in kcal.
    pub calorie_target: f64,
}

/// One line per alternative, numbers truncated toward zero.
fn render_alternatives(alternatives: &[&NutritionRecord]) -> String {
    if alternatives.is_empty() {
        return NO_ALTERNATIVES_FALLBACK.to_owned();
    }

    let mut text = String::new();
    for food in alternatives {
        let _ = writeln!(
            text,
            "- {}: {} kcal, {}g fat, {}g protein",
            food.food_name,
            food.energy_kcal.trunc() as i64,
            food.fat_g.trunc() as i64,
            food.protein_g.trunc() as i64,
        );
    }
    text
}

/// Builds the prompt handed to the text generator.
#[must_use]
pub fn build_recommendation_prompt(
    user: &UserContext,
    meal: &MealEntry,
    alternatives: &[&NutritionRecord],
) -> String {
    let alternatives_text = render_alternatives(alternatives);

    format!(
        "
    You are a friendly, expert nutritionist for a user in India whose goal is to reduce their risk of fatty liver disease.

    **User's Health Context:**
    - Predicted Triglycerides: {predicted_tg} mg/dL (High is > 150)
    - Daily Calorie Target: {calorie_target} kcal

    **User's Recent Meal:**
    - They just ate: {name} ({calories} kcal, {fat}g fat)

    **Task:**
    Write a short, encouraging, and conversational message for the user. Acknowledge their recent meal. Then, suggest a healthier but similar alternative for their next meal. Use one of the options from our database as the primary suggestion and briefly explain *why* it's a better choice. Do not invent new dishes.

    **Healthier Alternatives from our Database:**
    {alternatives_text}
    ",
        predicted_tg = user.predicted_tg,
        calorie_target = user.calorie_target,
        name = meal.name,
        calories = meal.calories,
        fat = meal.fat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserContext {
        UserContext {
            predicted_tg: 182.5,
            calorie_target: 2200.0,
        }
    }

    fn meal() -> MealEntry {
        MealEntry {
            name: "Chicken Biryani".to_owned(),
            calories: 600.0,
            fat: 30.0,
            protein: 25.0,
        }
    }

    #[test]
    fn test_empty_alternatives_use_fallback() {
        let prompt = build_recommendation_prompt(&user(), &meal(), &[]);

        assert!(prompt.contains(NO_ALTERNATIVES_FALLBACK));
        assert!(!prompt.contains("g protein"));

        let (_, alternatives) = prompt
            .split_once("**Healthier Alternatives from our Database:**")
            .unwrap();
        for line in alternatives.lines() {
            assert!(!line.trim_start().starts_with("- "), "{line}");
        }
    }

    #[test]
    fn test_alternative_lines_truncate_numbers() {
        let salad = NutritionRecord {
            food_name: "Chicken Salad".to_owned(),
            energy_kcal: 450.9,
            fat_g: 20.7,
            protein_g: 24.99,
        };
        let soup = NutritionRecord {
            food_name: "Chicken Soup".to_owned(),
            energy_kcal: 150.0,
            fat_g: 4.2,
            protein_g: 23.5,
        };

        let prompt = build_recommendation_prompt(&user(), &meal(), &[&salad, &soup]);

        assert!(prompt.contains("- Chicken Salad: 450 kcal, 20g fat, 24g protein\n"));
        assert!(prompt.contains("- Chicken Soup: 150 kcal, 4g fat, 23g protein\n"));
        assert!(!prompt.contains(NO_ALTERNATIVES_FALLBACK));
    }

    #[test]
    fn test_context_is_embedded() {
        let prompt = build_recommendation_prompt(&user(), &meal(), &[]);

        assert!(prompt.contains("Predicted Triglycerides: 182.5 mg/dL (High is > 150)"));
        assert!(prompt.contains("Daily Calorie Target: 2200 kcal"));
        assert!(prompt.contains("They just ate: Chicken Biryani (600 kcal, 30g fat)"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            build_recommendation_prompt(&user(), &meal(), &[]),
            build_recommendation_prompt(&user(), &meal(), &[])
        );
    }
}
