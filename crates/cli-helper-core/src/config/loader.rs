//! Configuration loader for YAML files and credential resolution
//!
//! Loading is file → provider defaults → validation. Credentials are resolved
//! separately so that a configuration can be inspected without a key present.

use crate::config::types::*;
use crate::errors::AssistantError;
use crate::llm::providers::default_model;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_DIR_NAME: &str = "cli-helper";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<HelperConfig, AssistantError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            AssistantError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        log::info!("Loaded configuration file {}", path.display());
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<HelperConfig, AssistantError> {
        let mut config: HelperConfig = if content.trim().is_empty() {
            HelperConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                AssistantError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::apply_provider_defaults(&mut config.llm);
        config.validate()?;

        Ok(config)
    }

    /// Load an explicitly named file, or the default location if it exists, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default file is not.
    pub async fn load_or_default(path: Option<&Path>) -> Result<HelperConfig, AssistantError> {
        if let Some(path) = path {
            return Self::from_file(path).await;
        }

        match Self::default_config_path() {
            Some(default_path) if default_path.exists() => Self::from_file(default_path).await,
            _ => {
                log::debug!("No configuration file found, using defaults");
                Ok(HelperConfig::default())
            }
        }
    }

    /// `<config_dir>/cli-helper/config.yaml`, when the platform has a config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Resolve the API key from the inline value or the configured environment variable.
    pub fn resolve_api_key(config: &LlmConfig) -> Result<String, AssistantError> {
        if let Some(key) = config.auth.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }

        let env_var = config
            .auth
            .api_key_env
            .clone()
            .unwrap_or_else(|| default_api_key_env(config.provider).to_string());

        match env::var(&env_var) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(AssistantError::ConfigError(format!(
                "Please set your {} environment variable",
                env_var
            ))),
        }
    }

    fn apply_provider_defaults(llm: &mut LlmConfig) {
        if llm.model.trim().is_empty() {
            llm.model = default_model(llm.provider).to_string();
        }
        if let Some(base_url) = &llm.base_url {
            llm.base_url = Some(base_url.trim_end_matches('/').to_string());
        }
    }
}

pub fn default_api_key_env(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAI | LlmProvider::Custom => "OPENAI_API_KEY",
        LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
    }
}
