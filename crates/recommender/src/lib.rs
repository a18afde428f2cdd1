//! Meal recommendations for users at risk of fatty liver disease.
//!
//! Retrieval is a keyword and threshold filter over a nutrition reference
//! table. The retrieved foods are rendered into a prompt and handed to a
//! [`TextGenerator`], normally the hosted [`GeminiGenerator`].

mod database;
mod error;
mod gemini;
mod generator;
mod prompt;
mod retriever;

pub use database::{NutritionDatabase, NutritionRecord};
pub use error::RecommendError;
pub use gemini::GeminiGenerator;
pub use generator::TextGenerator;
pub use prompt::{NO_ALTERNATIVES_FALLBACK, UserContext, build_recommendation_prompt};
pub use retriever::{
    DEFAULT_TOP_N, MAX_CALORIE_RATIO, MAX_FAT_RATIO, MIN_PROTEIN_RATIO, MealEntry,
    retrieve_alternatives,
};
