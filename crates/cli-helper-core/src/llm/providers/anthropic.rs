//! Anthropic Claude backend
//!
//! Messages API with `tool_use` / `tool_result` content blocks. The API requires
//! alternating roles, so consecutive turns of the same role are merged into one
//! message. This matters after a clarification answer, which commits a tool
//! result and a user text back to back.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::core_types::{ConversationTurn, ModelResponse, ToolCall};
use crate::errors::{AssistantError, BackendErrorKind};
use crate::llm::providers::status_error;
use crate::llm::{ModelBackend, ModelRequest, ToolMetadata};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    anthropic_version: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    system: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicError,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    message: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: ANTHROPIC_API_BASE.to_string(),
            model,
            max_tokens,
            temperature: None,
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: String) -> Self {
        let mut client = Self::new(api_key, config.model.clone(), config.parameters.max_tokens)
            .with_temperature(config.parameters.temperature);
        if let Some(version) = &config.parameters.anthropic_version {
            client.anthropic_version = version.clone();
        }
        if let Some(base_url) = &config.base_url {
            client = client.with_api_base(base_url.clone());
        }
        client
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        // The Messages API caps temperature at 1.0.
        self.temperature = Some(temperature.min(1.0));
        self
    }

    fn convert_history(&self, history: &[ConversationTurn]) -> Vec<AnthropicMessage> {
        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for turn in history {
            let (role, block) = match turn {
                ConversationTurn::UserText(text) => ("user", AnthropicContent::Text { text: text.clone() }),
                ConversationTurn::AssistantText(text) => {
                    ("assistant", AnthropicContent::Text { text: text.clone() })
                }
                ConversationTurn::AssistantToolCall {
                    call_id,
                    tool_name,
                    arguments,
                } => (
                    "assistant",
                    AnthropicContent::ToolUse {
                        id: call_id.clone(),
                        name: tool_name.clone(),
                        input: arguments.clone(),
                    },
                ),
                ConversationTurn::ToolResult { call_id, payload } => (
                    "user",
                    AnthropicContent::ToolResult {
                        tool_use_id: call_id.clone(),
                        content: payload.to_json().to_string(),
                    },
                ),
            };

            match messages.last_mut() {
                Some(last) if last.role == role => last.content.push(block),
                _ => messages.push(AnthropicMessage {
                    role,
                    content: vec![block],
                }),
            }
        }

        messages
    }

    fn convert_tools<'a>(&self, tools: &'a [ToolMetadata]) -> Vec<AnthropicTool<'a>> {
        tools
            .iter()
            .map(|tool| AnthropicTool {
                name: &tool.name,
                description: &tool.description,
                input_schema: &tool.input_schema,
            })
            .collect()
    }

    fn convert_response(&self, response: AnthropicResponse) -> Result<ModelResponse, AssistantError> {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicResponseContent::Text { text: chunk } => text.push_str(&chunk),
                AnthropicResponseContent::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments: input,
                    });
                }
                AnthropicResponseContent::Other => {}
            }
        }

        if tool_calls.len() > 1 {
            log::warn!(
                "Anthropic returned {} tool calls; only the first is used",
                tool_calls.len()
            );
        }

        if let Some(call) = tool_calls.into_iter().next() {
            return Ok(ModelResponse::ToolCall(call));
        }
        if text.is_empty() {
            return Err(AssistantError::backend(
                BackendErrorKind::InvalidPayload,
                "Response has neither text nor tool use",
            ));
        }
        Ok(ModelResponse::Text(text))
    }
}

#[async_trait]
impl ModelBackend for AnthropicClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, AssistantError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: self.convert_history(&request.history),
            system: &request.system_prompt,
            temperature: self.temperature,
            tools: self.convert_tools(&request.tools),
        };

        let url = format!("{}/v1/messages", self.api_base);
        log::debug!("Anthropic API request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.anthropic_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AssistantError::backend(BackendErrorKind::Connection, format!("Failed to read response: {}", e))
        })?;

        log::debug!("Anthropic API response ({}): {}", status, response_text);

        if !status.is_success() {
            let detail = serde_json::from_str::<AnthropicErrorBody>(&response_text)
                .map(|body| body.error.message)
                .unwrap_or(response_text);
            let err = status_error("Anthropic", status, &detail);
            log::error!("{}", err);
            return Err(err);
        }

        let parsed: AnthropicResponse = serde_json::from_str(&response_text).map_err(|e| {
            AssistantError::backend(
                BackendErrorKind::InvalidPayload,
                format!("Failed to parse response: {}", e),
            )
        })?;

        self.convert_response(parsed)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::ToolResultPayload;
    use crate::test_utils::mock_llm_server::{MockLLMServer, MockReply};
    use crate::tools::suggest_commands_metadata;
    use serde_json::json;

    fn create_test_client() -> AnthropicClient {
        AnthropicClient::new(
            "test-key".to_string(),
            "claude-3-5-sonnet-latest".to_string(),
            1000,
        )
    }

    #[test]
    fn test_client_creation() {
        let client = create_test_client().with_temperature(1.4);
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.api_base, ANTHROPIC_API_BASE);
        assert_eq!(client.temperature, Some(1.0));
        assert_eq!(client.anthropic_version, DEFAULT_ANTHROPIC_VERSION);
    }

    #[test]
    fn test_clarification_turns_are_merged() {
        let client = create_test_client();
        let history = vec![
            ConversationTurn::UserText("delete old logs".to_string()),
            ConversationTurn::AssistantToolCall {
                call_id: "toolu_1".to_string(),
                tool_name: "suggest_commands".to_string(),
                arguments: json!({"commands": [], "needs_more_info": true, "follow_up_question": "Which directory?"}),
            },
            ConversationTurn::ToolResult {
                call_id: "toolu_1".to_string(),
                payload: ToolResultPayload::Clarification {
                    follow_up_question: "Which directory?".to_string(),
                    user_response: "/var/log".to_string(),
                },
            },
            ConversationTurn::UserText("/var/log".to_string()),
        ];

        let messages = client.convert_history(&history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert!(matches!(messages[1].content[0], AnthropicContent::ToolUse { .. }));
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content.len(), 2);
        assert!(matches!(
            &messages[2].content[0],
            AnthropicContent::ToolResult { tool_use_id, .. } if tool_use_id == "toolu_1"
        ));
        assert_eq!(
            messages[2].content[1],
            AnthropicContent::Text { text: "/var/log".to_string() }
        );
    }

    #[test]
    fn test_convert_response_prefers_tool_use() {
        let client = create_test_client();
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Here are some options."},
                {"type": "tool_use", "id": "toolu_9", "name": "suggest_commands", "input": {"commands": [], "needs_more_info": true}}
            ]
        }))
        .unwrap();

        match client.convert_response(response).unwrap() {
            ModelResponse::ToolCall(call) => assert_eq!(call.id, "toolu_9"),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockLLMServer::start(vec![MockReply::ok(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "I'm a CLI assistant."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))])
        .await;

        let client = create_test_client().with_api_base(server.address());
        let request = ModelRequest {
            system_prompt: "system".to_string(),
            history: vec![ConversationTurn::UserText("hello".to_string())],
            tools: vec![suggest_commands_metadata()],
        };

        let response = client.generate(&request).await.unwrap();
        assert_eq!(response, ModelResponse::Text("I'm a CLI assistant.".to_string()));

        let requests = server.get_requests();
        assert_eq!(requests[0].path, "/v1/messages");
        assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));
        assert_eq!(requests[0].body["system"], "system");
        assert_eq!(requests[0].body["tools"][0]["name"], "suggest_commands");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_generate_maps_authentication_error() {
        let server = MockLLMServer::start(vec![MockReply::status(
            401,
            json!({"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}),
        )])
        .await;

        let client = create_test_client().with_api_base(server.address());
        let request = ModelRequest {
            system_prompt: "system".to_string(),
            history: vec![ConversationTurn::UserText("hello".to_string())],
            tools: vec![],
        };

        match client.generate(&request).await.unwrap_err() {
            AssistantError::Backend { kind, message } => {
                assert_eq!(kind, BackendErrorKind::Authentication);
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        server.shutdown().await;
    }
}
