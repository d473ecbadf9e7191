//! Configuration loading and validation tests

#[cfg(test)]
mod tests {
    use super::super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = ConfigLoader::from_str("").unwrap();
        assert_eq!(config, HelperConfig::default());
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.parameters.max_tokens, 1000);
        assert_eq!(config.runner.timeout_seconds, 60);
        assert!(config.session.auto_retry_failed_commands);
        assert_eq!(config.session.max_corrective_turns, 1);
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let yaml = r#"
llm:
  provider: anthropic
  parameters:
    max_tokens: 2048
runner:
  timeout_seconds: 0
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.model, "claude-3-5-sonnet-latest");
        assert_eq!(config.llm.parameters.max_tokens, 2048);
        assert_eq!(config.llm.parameters.temperature, 1.0);
        assert_eq!(config.runner.timeout_seconds, 0);
        assert!(config.session.auto_retry_failed_commands);
    }

    #[test]
    fn test_custom_provider_requires_base_url() {
        let err = ConfigLoader::from_str("llm:\n  provider: custom\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));

        let config = ConfigLoader::from_str(
            "llm:\n  provider: custom\n  base_url: http://localhost:11434/v1/\n",
        )
        .unwrap();
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ConfigLoader::from_str("llm:\n  parameters:\n    max_tokens: 0\n").is_err());
        assert!(ConfigLoader::from_str("llm:\n  parameters:\n    temperature: 3.5\n").is_err());
        assert!(ConfigLoader::from_str("session:\n  max_corrective_turns: 9\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = ConfigLoader::from_str("llm: [unterminated").unwrap_err();
        assert!(matches!(err, crate::errors::AssistantError::ConfigError(_)));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert_eq!("anthropic".parse::<LlmProvider>().unwrap(), LlmProvider::Anthropic);
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "llm:\n  model: gpt-4o-mini\nsession:\n  auto_retry_failed_commands: false").unwrap();

        let config = ConfigLoader::from_file(file.path()).await.unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(!config.session.auto_retry_failed_commands);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let missing = std::path::Path::new("/definitely/not/here/cli-helper.yaml");
        let err = ConfigLoader::load_or_default(Some(missing)).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    #[serial]
    fn test_resolve_api_key_from_environment() {
        std::env::set_var("CLI_HELPER_TEST_KEY", "sk-test");
        let mut llm = LlmConfig::default();
        llm.auth.api_key_env = Some("CLI_HELPER_TEST_KEY".to_string());

        assert_eq!(ConfigLoader::resolve_api_key(&llm).unwrap(), "sk-test");

        std::env::remove_var("CLI_HELPER_TEST_KEY");
        let err = ConfigLoader::resolve_api_key(&llm).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Please set your CLI_HELPER_TEST_KEY environment variable"
        );
    }

    #[test]
    #[serial]
    fn test_inline_api_key_wins() {
        let mut llm = LlmConfig::default();
        llm.auth.api_key = Some("inline-key".to_string());
        llm.auth.api_key_env = Some("CLI_HELPER_UNSET_KEY".to_string());
        assert_eq!(ConfigLoader::resolve_api_key(&llm).unwrap(), "inline-key");
    }

    #[test]
    fn test_default_api_key_env_per_provider() {
        assert_eq!(default_api_key_env(LlmProvider::OpenAI), "OPENAI_API_KEY");
        assert_eq!(default_api_key_env(LlmProvider::Custom), "OPENAI_API_KEY");
        assert_eq!(default_api_key_env(LlmProvider::Anthropic), "ANTHROPIC_API_KEY");
    }
}
