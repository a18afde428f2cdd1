//! Seam for the hosted text generator.

use async_trait::async_trait;

use crate::RecommendError;

/// Turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator is unreachable or rejects the request.
    async fn generate(&self, prompt: &str) -> Result<String, RecommendError>;
}
