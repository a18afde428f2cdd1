//! Retrieval, prompt rendering and generation for one logged meal.

use recommender::{
    DEFAULT_TOP_N, MealEntry, UserContext, build_recommendation_prompt, retrieve_alternatives,
};
use serde::Deserialize;
use tracing::info;

use crate::{RecommendationContext, ServiceError};

/// A decoded recommendation request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationRequest {
    pub user_context: UserContext,
    pub original_meal: MealEntry,
}

/// Returns the generator's recommendation for the meal, unmodified.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] if the meal has no name, or
/// [`ServiceError::UpstreamGeneration`] if the generator fails.
pub async fn recommend(
    context: &RecommendationContext,
    request: &RecommendationRequest,
) -> Result<String, ServiceError> {
    let alternatives = retrieve_alternatives(
        &request.original_meal,
        context.database(),
        DEFAULT_TOP_N,
    )?;

    info!(
        meal = %request.original_meal.name,
        alternatives = alternatives.len(),
        "Building recommendation"
    );

    let prompt =
        build_recommendation_prompt(&request.user_context, &request.original_meal, &alternatives);

    Ok(context.generator().generate(&prompt).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{recommendation_context, recommendation_payload};

    fn request() -> RecommendationRequest {
        serde_json::from_value(recommendation_payload()).unwrap()
    }

    #[tokio::test]
    async fn test_prompt_carries_retrieved_alternatives() {
        let context = recommendation_context(false);

        let text = recommend(&context, &request()).await.unwrap();

        assert!(text.starts_with("ECHO: "));
        assert!(text.contains("- Chicken Salad: 450 kcal, 20g fat, 24g protein"));
        assert!(!text.contains("Beef Curry"));
    }

    #[tokio::test]
    async fn test_no_match_uses_fallback() {
        let context = recommendation_context(false);
        let mut request = request();
        request.original_meal.name = "Paneer Tikka".to_owned();

        let text = recommend(&context, &request).await.unwrap();

        assert!(text.contains(recommender::NO_ALTERNATIVES_FALLBACK));
    }

    #[tokio::test]
    async fn test_generator_failure_is_upstream_error() {
        let context = recommendation_context(true);

        let err = recommend(&context, &request()).await.unwrap_err();

        assert!(matches!(err, ServiceError::UpstreamGeneration(_)));
    }
}
