//! LLM provider implementations
//!
//! Each provider implements `ModelBackend`, translating typed conversation
//! history into its own request format and mapping its failures onto
//! `BackendErrorKind`. The provider is chosen once, from configuration.

use std::sync::Arc;

use reqwest::StatusCode;

use crate::config::{LlmConfig, LlmProvider};
use crate::errors::{AssistantError, BackendErrorKind};
use crate::llm::ModelBackend;

pub mod anthropic;
pub mod openai;

/// Create a model backend based on the provider configuration
pub fn create_backend(
    config: &LlmConfig,
    api_key: String,
) -> Result<Arc<dyn ModelBackend>, AssistantError> {
    config.validate()?;

    let backend: Arc<dyn ModelBackend> = match config.provider {
        LlmProvider::OpenAI => Arc::new(openai::OpenAIClient::from_config(config, api_key)),
        LlmProvider::Custom => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                AssistantError::ConfigError("Custom provider requires a valid 'base_url'".to_string())
            })?;
            Arc::new(openai::OpenAIClient::from_config(config, api_key).with_api_base(base_url))
        }
        LlmProvider::Anthropic => Arc::new(anthropic::AnthropicClient::from_config(config, api_key)),
    };

    log::info!(
        "Using {} backend with model {}",
        backend.name(),
        config.model
    );
    Ok(backend)
}

/// Get the default model for a provider if none is specified
pub fn default_model(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAI => "gpt-4o",
        LlmProvider::Anthropic => "claude-3-5-sonnet-latest",
        LlmProvider::Custom => "gpt-4o",
    }
}

/// Map a non-success HTTP status onto the backend error taxonomy.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> AssistantError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS => BackendErrorKind::RateLimited,
        _ => BackendErrorKind::Api,
    };
    AssistantError::backend(
        kind,
        format!("{} API request failed with status {}: {}", provider, status, body),
    )
}

/// Id for tool calls that arrive without one.
pub(crate) fn synthesize_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
