use std::path::PathBuf;

use clap::Parser;
use cli_helper_core::config::{HelperConfig, LlmProvider};
use cli_helper_core::errors::AssistantError;
use cli_helper_core::llm::providers::default_model;

#[derive(Parser, Debug)]
#[clap(
    name = "cli-helper",
    author,
    version,
    about = "LLM-powered CLI helper that suggests and runs shell commands"
)]
pub struct Cli {
    #[clap(long, help = "Model to use (defaults to the provider's default model)")]
    pub model: Option<String>,

    #[clap(long, help = "Maximum tokens for each model response")]
    pub max_tokens: Option<u32>,

    #[clap(short, long, help = "Initial question to start with")]
    pub question: Option<String>,

    #[clap(long, help = "Model provider: openai, anthropic or custom")]
    pub provider: Option<String>,

    #[clap(long, help = "Base URL of an OpenAI-compatible API (custom provider)")]
    pub base_url: Option<String>,

    #[clap(long, help = "Seconds before a running command is killed (0 disables)")]
    pub timeout: Option<u64>,

    #[clap(long, help = "Do not ask the model to correct a failed command")]
    pub no_auto_retry: bool,

    #[clap(long, short, help = "Configuration file (YAML)")]
    pub config: Option<PathBuf>,

    #[clap(long, short, default_value = "warn")]
    pub log_level: String,

    #[clap(long, help = "Write logs to this file instead of stderr")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut HelperConfig) -> Result<(), AssistantError> {
        if let Some(provider) = &self.provider {
            let provider: LlmProvider = provider.parse()?;
            // Keep a model the user picked; swap the previous provider's default.
            if config.llm.model == default_model(config.llm.provider) {
                config.llm.model = default_model(provider).to_string();
            }
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.llm.base_url = Some(base_url.trim_end_matches('/').to_string());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.parameters.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.timeout {
            config.runner.timeout_seconds = timeout;
        }
        if self.no_auto_retry {
            config.session.auto_retry_failed_commands = false;
        }

        config.validate()
    }
}
