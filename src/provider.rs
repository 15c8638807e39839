//! LLM provider plumbing: resolve a provider and call it for pages and prompts.
//!
//! [`ProviderClient`] is the production [`TextExtractor`] and
//! [`TextCompleter`]. It is intentionally thin: prompts live in
//! [`crate::prompts`], retry lives in [`crate::pipeline::page`], and every
//! call here is a single bounded request.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ExtractorError};
use crate::pipeline::encode::to_image_data;
use crate::pipeline::optimize::OptimizedImage;
use crate::pipeline::page::TextExtractor;
use crate::prompts::PAGE_TRANSCRIPTION_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Model used when `GEMINI_API_KEY` selects the provider.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Model used when `OPENAI_API_KEY` selects the provider, or a provider is
/// named without a model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Answers a text prompt. Used by [`crate::analysis::ContractAnalyst`].
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExtractorError>;
}

/// Vision extractor and text completer over an `edgequake_llm` provider.
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    page_prompt: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Use `provider` with the call settings of `config`.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            page_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| PAGE_TRANSCRIPTION_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ExtractorError> {
        let options = build_options(self.temperature, self.max_tokens);
        let response = tokio::time::timeout(self.timeout, self.provider.chat(messages, Some(&options)))
            .await
            .map_err(|_| ExtractorError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ExtractorError::Provider(e.to_string()))?;

        debug!(
            "LLM call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

#[async_trait]
impl TextExtractor for ProviderClient {
    async fn extract_text(&self, image: &OptimizedImage) -> Result<String, ExtractorError> {
        // The image carries the content; the empty user text only gives the
        // model a user turn to answer.
        let messages = [
            ChatMessage::system(self.page_prompt.as_str()),
            ChatMessage::user_with_images("", vec![to_image_data(image)]),
        ];
        self.chat(&messages).await
    }
}

#[async_trait]
impl TextCompleter for ProviderClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExtractorError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        self.chat(&messages).await
    }
}

/// Build `CompletionOptions` for one call.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    debug!("Creating provider '{}' with model '{}'", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`, or
///    [`DEFAULT_OPENAI_MODEL`].
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both non-empty.
/// 4. **`GEMINI_API_KEY`**: Gemini with `config.model` or
///    [`DEFAULT_GEMINI_MODEL`].
/// 5. **`OPENAI_API_KEY`**: OpenAI with `config.model` or
///    [`DEFAULT_OPENAI_MODEL`].
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        env_non_empty("EDGEQUAKE_LLM_PROVIDER"),
        env_non_empty("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if env_non_empty("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider("gemini", model);
    }

    if env_non_empty("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(config.temperature, config.max_tokens);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn env_non_empty_ignores_blank_values() {
        assert_eq!(env_non_empty("CONTRACT_OCR_SURELY_UNSET_VARIABLE"), None);
    }
}
