//! Semantic extraction: ask a chat model to fill the allergen/nutrition schema.
//!
//! This module is the only stage with network I/O. One completion is made per
//! document, with the system message from [`crate::prompts`] and the
//! extraction prompt wrapping the (truncated) document text. The reply goes
//! through [`clean_json_response`] and is shaped by
//! [`SchemaPayload::from_value`].
//!
//! ## No retries
//!
//! A failed completion surfaces immediately as [`ExtractError::Upstream`]; the
//! caller decides whether to resubmit the upload.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::pipeline::postprocess::clean_json_response;
use crate::prompts::{extraction_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::schema::SchemaPayload;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One chat completion: system message, user message, sampling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Minimal chat-completion seam between the extractor and the provider.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the assistant's text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError>;
}

/// [`CompletionClient`] backed by an `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &"<dyn LLMProvider>")
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::Upstream {
                message: format!("{}", e),
            })?;

        debug!(
            "Completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Turns document text into the fixed allergen/nutrition schema.
#[async_trait]
pub trait SemanticExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<SchemaPayload, ExtractError>;
}

/// [`SemanticExtractor`] driven by a chat model.
pub struct LlmSemanticExtractor {
    client: Arc<dyn CompletionClient>,
    system_prompt: String,
    prompt_char_limit: usize,
    temperature: f32,
    max_tokens: usize,
}

impl LlmSemanticExtractor {
    /// Build an extractor over `client`, taking prompt and sampling settings
    /// from `config`.
    pub fn from_config(client: Arc<dyn CompletionClient>, config: &ExtractorConfig) -> Self {
        Self {
            client,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            prompt_char_limit: config.prompt_char_limit,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// The request that would be sent for `text`.
    pub fn request_for(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            system: self.system_prompt.clone(),
            user: extraction_prompt(text, self.prompt_char_limit),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl std::fmt::Debug for LlmSemanticExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSemanticExtractor")
            .field("prompt_char_limit", &self.prompt_char_limit)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SemanticExtractor for LlmSemanticExtractor {
    async fn extract(&self, text: &str) -> Result<SchemaPayload, ExtractError> {
        let start = Instant::now();
        let request = self.request_for(text);

        let raw = self.client.complete(&request).await?;
        let payload = parse_payload(&raw)?;

        info!(
            "Semantic extraction: {} allergens present in {}ms",
            payload.allergens.present().len(),
            start.elapsed().as_millis()
        );
        Ok(payload)
    }
}

/// Sanitise a raw completion and shape it into the schema.
pub fn parse_payload(raw: &str) -> Result<SchemaPayload, ExtractError> {
    let cleaned = clean_json_response(raw);
    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        warn!("Model reply is not JSON ({} chars): {}", raw.chars().count(), e);
        ExtractError::Parse {
            detail: e.to_string(),
        }
    })?;
    SchemaPayload::from_value(&value)
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with the configured model.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are non-empty.
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the configured model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ExtractorConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
