//! Google Gemini `generateContent` client.

use core::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use config::GeneratorConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{RecommendError, TextGenerator};

/// Base URL for the Gemini API
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Retries after the first attempt.
const MAX_RETRIES: usize = 3;

fn default_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_max_times(MAX_RETRIES)
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(8))
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl<'a> GenerateRequest<'a> {
    const fn user_prompt(text: &'a str) -> Self {
        Self {
            contents: [Content {
                role: "user",
                parts: [Part { text }],
            }],
        }
    }
}

impl GenerateResponse {
    /// First text part of the first candidate.
    fn into_text(self) -> Result<String, RecommendError> {
        if let Some(error) = self.error {
            return Err(RecommendError::Generation {
                status: None,
                message: error.message,
            });
        }

        self.candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| RecommendError::Generation {
                status: None,
                message: "response contained no candidates".to_owned(),
            })
    }
}

/// Extracts the API's error message from an error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GenerateResponse>(body)
        .ok()
        .and_then(|response| response.error)
        .map_or_else(|| body.to_owned(), |error| error.message)
}

/// [`TextGenerator`] backed by the hosted Gemini REST API.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    backoff: ExponentialBuilder,
}

impl GeminiGenerator {
    /// Creates a client from the generator settings.
    ///
    /// # Errors
    ///
    /// Returns [`RecommendError::MissingApiKey`] if no key is configured, or
    /// [`RecommendError::Transport`] if the HTTP client cannot be created.
    pub fn new(config: &GeneratorConfig) -> Result<Self, RecommendError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(RecommendError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecommendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: API_BASE_URL.to_owned(),
            backoff: default_backoff(),
        })
    }

    /// Points the client at another API root, e.g. a regional endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replaces the retry schedule used for throttled and failed requests.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, RecommendError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::user_prompt(prompt))
            .send()
            .await
            .map_err(|e| RecommendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecommendError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RecommendError::Generation {
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }

        serde_json::from_str::<GenerateResponse>(&body)
            .map_err(|e| RecommendError::Generation {
                status: Some(status.as_u16()),
                message: format!("failed to parse response: {e}"),
            })?
            .into_text()
    }
}

impl core::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, RecommendError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting recommendation");

        let text = (|| self.generate_once(prompt))
            .retry(self.backoff)
            .when(RecommendError::is_retryable)
            .notify(|err, delay| {
                warn!(error = %err, ?delay, "Generator request failed, will retry");
            })
            .await
            .inspect_err(|err| error!(error = %err, "Text generation failed"))?;

        info!(model = %self.model, chars = text.len(), "Generated recommendation");

        Ok(text)
    }
}
