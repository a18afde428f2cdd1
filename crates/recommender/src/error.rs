//! Errors raised by retrieval and text generation.

/// Failure to retrieve alternatives or generate a recommendation.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    /// The consumed meal has no name to derive an ingredient from.
    #[error("meal name must not be empty")]
    EmptyMealName,

    /// The nutrition reference table could not be read.
    #[error("invalid nutrition database: {0}")]
    Database(String),

    /// The generator answered with an error status or an unusable body.
    #[error("text generation failed (status {status:?}): {message}")]
    Generation {
        status: Option<u16>,
        message: String,
    },

    /// No API key was configured for the hosted generator.
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    /// The generator could not be reached.
    #[error("text generator unreachable: {0}")]
    Transport(String),
}

impl RecommendError {
    /// Whether the generator asked us to back off or failed on its side
    /// (HTTP 429 or 5xx).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation { status: Some(status), .. } if *status == 429 || *status >= 500
        )
    }
}
