//! OpenAI-compatible translation client.
//!
//! This module provides an implementation of the `InferenceClient` trait on top
//! of the chat completions API. Any server speaking that API (OpenAI, vLLM,
//! LM Studio, ...) can be targeted through the base URL.

use async_trait::async_trait;
use babel_abstraction::{
    InferenceClient, InferenceError, InferenceRequest, InferenceResult, ProviderMetadata,
    TokenUsage,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Default endpoint for the hosted OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Translation client for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    /// The model ID (e.g., "gpt-4o-mini").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL of the API.
    base_url: String,
    /// Completion token budget per call.
    max_tokens: u32,
    /// Sampling temperature.
    temperature: f32,
    /// Deadline for a single call.
    timeout: Option<Duration>,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiTranslator {
    /// Creates a translator reading its key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns `InferenceError::AuthFailure` if the variable is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new(model_id: String) -> Result<Self, InferenceError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            InferenceError::AuthFailure("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a translator with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            timeout: None,
            client: Client::new(),
        }
    }

    /// Points the client at another OpenAI-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the completion token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bounds every call; an exceeded deadline surfaces as `NetworkFailure`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the chat messages for a request.
    fn build_messages(request: &InferenceRequest) -> Vec<OpenAiMessage> {
        let source = request
            .source_variant
            .as_deref()
            .map_or_else(String::new, |source| format!(" from language code '{source}'"));
        let instructions = format!(
            "You are a translation engine. Translate the user's message{source} into language code '{}'. Reply with the translation only.",
            request.target_variant
        );

        vec![
            OpenAiMessage { role: "system".to_string(), content: instructions },
            OpenAiMessage { role: "user".to_string(), content: request.input.clone() },
        ]
    }
}

/// Maps an HTTP error status from the provider into the failure taxonomy.
pub(crate) fn classify_status(
    status: u16,
    retry_after: Option<Duration>,
    body: String,
) -> InferenceError {
    match status {
        429 => InferenceError::RateLimited { retry_after },
        401 | 403 => InferenceError::AuthFailure(format!("API error ({status}): {body}")),
        400 | 404 | 413 | 422 => InferenceError::MalformedInput(format!("API error ({status}): {body}")),
        500 | 502 | 503 | 504 | 529 => {
            InferenceError::ServiceUnavailable(format!("API error ({status}): {body}"))
        }
        _ => InferenceError::Unknown(format!("API error ({status}): {body}")),
    }
}

/// Maps a transport-level failure into the failure taxonomy.
fn classify_transport(err: &reqwest::Error) -> InferenceError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        InferenceError::NetworkFailure(err.to_string())
    } else {
        InferenceError::Unknown(err.to_string())
    }
}

/// Reads a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl InferenceClient for OpenAiTranslator {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
        debug!(
            model_id = %self.model_id,
            input_len = request.input.len(),
            source = ?request.source_variant,
            target = %request.target_variant,
            "OpenAiTranslator invoking provider"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = OpenAiRequest {
            model: self.model_id.clone(),
            messages: Self::build_messages(request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let mut builder = self.client.post(&url).bearer_auth(&self.api_key).json(&request_body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "Failed to send request to translation provider");
            classify_transport(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                "Translation provider returned error status"
            );
            return Err(classify_status(status.as_u16(), retry_after, error_text));
        }

        let openai_response: OpenAiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse translation provider response");
            if e.is_timeout() {
                InferenceError::NetworkFailure(e.to_string())
            } else {
                InferenceError::Unknown(format!("Failed to parse response: {e}"))
            }
        })?;

        let output = openai_response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                error!("No content in translation provider response");
                InferenceError::Unknown("No content in API response".to_string())
            })?;

        let usage = openai_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(InferenceResult {
            output,
            provider_metadata: ProviderMetadata {
                model_id: Some(openai_response.model.unwrap_or_else(|| self.model_id.clone())),
                detected_source: None,
                usage,
            },
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn provider_id(&self) -> &str {
        &self.model_id
    }
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
