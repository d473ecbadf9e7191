use crate::config::LlmConfig;
use crate::core_types::{ConversationTurn, ModelResponse, ToolCall};
use crate::errors::{AssistantError, BackendErrorKind};
use crate::llm::providers::{status_error, synthesize_call_id};
use crate::llm::{ModelBackend, ModelRequest, ToolMetadata};
use async_trait::async_trait;
use reqwest::Client;

use serde_json::{json, Value};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: OPENAI_API_BASE.to_string(),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: String) -> Self {
        Self::new(api_key, config.model.clone())
            .with_temperature(config.parameters.temperature)
            .with_max_tokens(config.parameters.max_tokens)
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request_body(&self, request: &ModelRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.format_messages(&request.system_prompt, &request.history),
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = temp.into();
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(self.format_tools(&request.tools));
            body["tool_choice"] = "auto".into();
        }

        body
    }

    fn format_tools(&self, tools: &[ToolMetadata]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema
                    }
                })
            })
            .collect()
    }

    fn format_messages(&self, system_prompt: &str, history: &[ConversationTurn]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(json!({"role": "system", "content": system_prompt}));

        for turn in history {
            let message = match turn {
                ConversationTurn::UserText(content) => json!({
                    "role": "user",
                    "content": content
                }),
                ConversationTurn::AssistantText(content) => json!({
                    "role": "assistant",
                    "content": content
                }),
                ConversationTurn::AssistantToolCall {
                    call_id,
                    tool_name,
                    arguments,
                } => json!({
                    "role": "assistant",
                    "content": Value::Null,
                    "tool_calls": [{
                        "id": call_id,
                        "type": "function",
                        "function": {
                            "name": tool_name,
                            "arguments": arguments.to_string()
                        }
                    }]
                }),
                ConversationTurn::ToolResult { call_id, payload } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": payload.to_json().to_string()
                }),
            };
            messages.push(message);
        }

        messages
    }

    fn parse_response(&self, response: Value) -> Result<ModelResponse, AssistantError> {
        let invalid = |msg: &str| AssistantError::backend(BackendErrorKind::InvalidPayload, msg);

        let choices = response["choices"]
            .as_array()
            .ok_or_else(|| invalid("No choices in response"))?;
        let message = &choices
            .first()
            .ok_or_else(|| invalid("Empty choices array"))?["message"];

        if let Some(calls) = message["tool_calls"].as_array().filter(|c| !c.is_empty()) {
            if calls.len() > 1 {
                log::warn!(
                    "OpenAI returned {} tool calls; only the first is used",
                    calls.len()
                );
            }
            let call = &calls[0];
            let function = &call["function"];
            let name = function["name"]
                .as_str()
                .ok_or_else(|| invalid("Tool call without a function name"))?;
            let arguments_str = function["arguments"].as_str().unwrap_or("{}");
            let arguments: Value = serde_json::from_str(arguments_str).map_err(|e| {
                invalid(&format!("Invalid tool call arguments JSON: {}", e))
            })?;
            let id = call["id"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(synthesize_call_id);

            return Ok(ModelResponse::ToolCall(ToolCall {
                id,
                name: name.to_string(),
                arguments,
            }));
        }

        match message["content"].as_str() {
            Some(content) => Ok(ModelResponse::Text(content.to_string())),
            None => Err(invalid("Response has neither content nor tool calls")),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAIClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, AssistantError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(request);

        log::debug!("OpenAI API request to {}", url);
        log::debug!("Request body: {}", serde_json::to_string_pretty(&body).unwrap_or_default());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AssistantError::backend(BackendErrorKind::Connection, format!("Failed to read response: {}", e))
        })?;

        log::debug!("OpenAI API response ({}): {}", status, response_text);

        if !status.is_success() {
            let err = status_error("OpenAI", status, &response_text);
            log::error!("{}", err);
            return Err(err);
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            AssistantError::backend(BackendErrorKind::InvalidPayload, format!("Invalid JSON response: {}", e))
        })?;

        self.parse_response(response_json)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{CommandExecutionResult, ToolResultPayload};
    use crate::test_utils::mock_llm_server::{MockLLMServer, MockReply};
    use crate::tools::suggest_commands_metadata;

    fn request(history: Vec<ConversationTurn>) -> ModelRequest {
        ModelRequest {
            system_prompt: "You are a helpful CLI assistant running in bash shell.".to_string(),
            history,
            tools: vec![suggest_commands_metadata()],
        }
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string())
            .with_temperature(0.7)
            .with_max_tokens(1000)
            .with_api_base("http://localhost:8080/v1/".to_string());

        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.model, "gpt-4o");
        assert_eq!(client.temperature, Some(0.7));
        assert_eq!(client.max_tokens, Some(1000));
        assert_eq!(client.api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn test_message_formatting() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string());
        let history = vec![
            ConversationTurn::UserText("list files".to_string()),
            ConversationTurn::AssistantToolCall {
                call_id: "call_1".to_string(),
                tool_name: "suggest_commands".to_string(),
                arguments: json!({"commands": [], "needs_more_info": true}),
            },
            ConversationTurn::ToolResult {
                call_id: "call_1".to_string(),
                payload: ToolResultPayload::Execution(CommandExecutionResult {
                    command: "ls".to_string(),
                    stdout: Some("a.txt\n".to_string()),
                    stderr: Some(String::new()),
                    success: true,
                }),
            },
            ConversationTurn::AssistantText("Done.".to_string()),
        ];

        let formatted = client.format_messages("system prompt", &history);
        assert_eq!(formatted.len(), 5);
        assert_eq!(formatted[0]["role"], "system");
        assert_eq!(formatted[1]["role"], "user");
        assert_eq!(formatted[1]["content"], "list files");
        assert_eq!(formatted[2]["role"], "assistant");
        assert!(formatted[2]["content"].is_null());
        assert_eq!(formatted[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(formatted[2]["tool_calls"][0]["function"]["name"], "suggest_commands");
        let arguments: Value =
            serde_json::from_str(formatted[2]["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
                .unwrap();
        assert_eq!(arguments["needs_more_info"], true);
        assert_eq!(formatted[3]["role"], "tool");
        assert_eq!(formatted[3]["tool_call_id"], "call_1");
        let content: Value = serde_json::from_str(formatted[3]["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["stdout"], "a.txt\n");
        assert_eq!(formatted[4]["content"], "Done.");
    }

    #[test]
    fn test_request_body_includes_tools() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string()).with_max_tokens(500);
        let body = client.build_request_body(&request(vec![]));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "suggest_commands");
    }

    #[test]
    fn test_parse_keeps_first_tool_call_only() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string());
        let response = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "suggest_commands", "arguments": "{\"commands\":[],\"needs_more_info\":true}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "suggest_commands", "arguments": "{}"}}
                    ]
                }
            }]
        });

        match client.parse_response(response).unwrap() {
            ModelResponse::ToolCall(call) => {
                assert_eq!(call.id, "call_a");
                assert_eq!(call.arguments["needs_more_info"], true);
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_arguments() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string());
        let response = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "call_a", "function": {"name": "suggest_commands", "arguments": "{not json"}}
            ]}}]
        });

        let err = client.parse_response(response).unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Backend { kind: BackendErrorKind::InvalidPayload, .. }
        ));
    }

    #[test]
    fn test_parse_empty_message() {
        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string());
        assert!(client.parse_response(json!({"choices": []})).is_err());
        assert!(client
            .parse_response(json!({"choices": [{"message": {"content": null}}]}))
            .is_err());
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockLLMServer::start(vec![MockReply::ok(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello! I can help with shell commands."}}]
        }))])
        .await;

        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string())
            .with_api_base(format!("{}/v1", server.address()));

        let response = client
            .generate(&request(vec![ConversationTurn::UserText("hi".to_string())]))
            .await
            .unwrap();
        assert_eq!(
            response,
            ModelResponse::Text("Hello! I can help with shell commands.".to_string())
        );

        let requests = server.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/v1/chat/completions");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-key"));
        assert_eq!(requests[0].body["messages"][1]["content"], "hi");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_generate_maps_rate_limit() {
        let server = MockLLMServer::start(vec![MockReply::status(
            429,
            json!({"error": {"message": "Rate limit reached"}}),
        )])
        .await;

        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string())
            .with_api_base(format!("{}/v1", server.address()));

        let err = client.generate(&request(vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Backend { kind: BackendErrorKind::RateLimited, .. }
        ));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_generate_connection_failure() {
        // Reserve a port, then free it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string())
            .with_api_base(format!("http://{}/v1", addr));

        let err = client.generate(&request(vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Backend { kind: BackendErrorKind::Connection, .. }
        ));
    }
}
