//! Configuration type definitions for the CLI helper
//!
//! Every field carries a serde default, so an empty YAML document is a valid
//! configuration and a file only needs to mention what it changes.

use serde::{Deserialize, Serialize};

use crate::errors::AssistantError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HelperConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Empty means the provider's default model.
    #[serde(default)]
    pub model: String,
    /// Endpoint for the `custom` provider (any OpenAI-compatible API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: LlmAuth,
}

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Custom,
}

impl std::str::FromStr for LlmProvider {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "custom" => Ok(LlmProvider::Custom),
            other => Err(AssistantError::ConfigError(format!(
                "Unknown provider '{}'. Expected openai, anthropic or custom",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LlmAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// Seconds before a running command is killed. Zero disables the limit.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Overrides the shell detected from `$SHELL`.
    #[serde(default)]
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_true")]
    pub auto_retry_failed_commands: bool,
    #[serde(default = "default_max_corrective_turns")]
    pub max_corrective_turns: u32,
}

pub const MAX_CORRECTIVE_TURNS: u32 = 3;

impl HelperConfig {
    pub fn validate(&self) -> Result<(), AssistantError> {
        self.llm.validate()?;

        if self.session.max_corrective_turns > MAX_CORRECTIVE_TURNS {
            return Err(AssistantError::ConfigError(format!(
                "session.max_corrective_turns must be at most {}, got {}",
                MAX_CORRECTIVE_TURNS, self.session.max_corrective_turns
            )));
        }

        Ok(())
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.model.trim().is_empty() {
            return Err(AssistantError::ConfigError(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.parameters.max_tokens == 0 {
            return Err(AssistantError::ConfigError(
                "llm.parameters.max_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.parameters.temperature) {
            return Err(AssistantError::ConfigError(format!(
                "llm.parameters.temperature must be between 0 and 2, got {}",
                self.parameters.temperature
            )));
        }
        if self.provider == LlmProvider::Custom
            && self.base_url.as_deref().map_or(true, |url| url.trim().is_empty())
        {
            return Err(AssistantError::ConfigError(
                "Custom provider requires a valid 'base_url'".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_temperature() -> f32 { 1.0 }
fn default_max_tokens() -> u32 { 1000 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_true() -> bool { true }
fn default_max_corrective_turns() -> u32 { 1 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: crate::llm::providers::default_model(LlmProvider::OpenAI).to_string(),
            base_url: None,
            parameters: ModelParameters::default(),
            auth: LlmAuth::default(),
        }
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            anthropic_version: None,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            shell: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_retry_failed_commands: default_true(),
            max_corrective_turns: default_max_corrective_turns(),
        }
    }
}
