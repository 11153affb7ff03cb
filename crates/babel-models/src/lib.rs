//! Provider clients and in-process caching for Babel.
//!
//! This crate provides concrete implementations of the `InferenceClient` trait
//! together with the cache key codec and the first, process-local cache tier.
//!
//! # Supported Providers
//!
//! - **Mock**: Offline testing and development
//! - **OpenAI**: OpenAI and OpenAI-compatible servers (API key required)

pub mod cache;
pub mod factory;
pub mod openai;

use async_trait::async_trait;
use babel_abstraction::{
    InferenceClient, InferenceError, InferenceRequest, InferenceResult, ProviderMetadata,
    TokenUsage,
};
use tracing::debug;

pub use cache::{CacheConfig, CacheConfigError, CacheKey, CacheKeyCodec, KeyPolicy, TierOneCache};
pub use factory::{ClientConfig, ClientFactory, ProviderType};
pub use openai::OpenAiTranslator;

/// A deterministic offline translator for testing and demonstration.
///
/// The "translation" is the input prefixed with the target variant, e.g.
/// `[ja] Hello`.
#[derive(Debug, Default)]
pub struct MockTranslator {
    id: String,
}

impl MockTranslator {
    /// Creates a new `MockTranslator` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl InferenceClient for MockTranslator {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
        debug!(
            model_id = %self.id,
            target = %request.target_variant,
            "MockTranslator translating"
        );

        if request.input.trim().is_empty() {
            return Err(InferenceError::MalformedInput("empty input".to_string()));
        }

        let output = format!("[{}] {}", request.target_variant, request.input.trim());
        let prompt_tokens = count_tokens(&request.input);
        let completion_tokens = count_tokens(&output);

        Ok(InferenceResult {
            output,
            provider_metadata: ProviderMetadata {
                model_id: Some(self.id.clone()),
                detected_source: request.source_variant.is_none().then(|| "und".to_string()),
                usage: Some(TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                }),
            },
            elapsed_ms: 0,
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
