//! Core type definitions shared by the engine, the backends and the session
//!
//! Conversation history is kept as strongly typed turns. Backends project these
//! turns into their own wire formats and parse their replies back into a
//! `ModelResponse`; nothing in the engine deals with raw provider JSON.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Model-assigned risk tag for a suggested command. Informational only.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Dangerous,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Dangerous => "dangerous",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandSuggestion {
    pub command: String,
    pub description: String,
    pub safety_level: SafetyLevel,
}

/// Decoded arguments of a `suggest_commands` tool call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SuggestResponse {
    pub commands: Vec<CommandSuggestion>,
    pub needs_more_info: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
}

/// Outcome of running one shell command.
///
/// `stdout` and `stderr` are `None` only when the process could not be started;
/// a process that ran and printed nothing has empty strings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandExecutionResult {
    pub command: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub success: bool,
}

impl CommandExecutionResult {
    pub fn spawn_failure(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdout: None,
            stderr: None,
            success: false,
        }
    }

    pub fn runner_failed(&self) -> bool {
        self.stdout.is_none()
    }
}

/// Content written back to the model for a pending tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResultPayload {
    Execution(CommandExecutionResult),
    Cancelled { reason: String },
    Clarification {
        follow_up_question: String,
        user_response: String,
    },
}

impl ToolResultPayload {
    pub fn to_json(&self) -> Value {
        match self {
            ToolResultPayload::Execution(result) => json!({
                "command": result.command,
                "stdout": result.stdout,
                "stderr": result.stderr,
                "success": result.success,
            }),
            ToolResultPayload::Cancelled { reason } => json!({
                "command": Value::Null,
                "cancelled": true,
                "reason": reason,
            }),
            ToolResultPayload::Clarification {
                follow_up_question,
                user_response,
            } => json!({
                "needs_more_info": true,
                "follow_up_question": follow_up_question,
                "user_response": user_response,
            }),
        }
    }
}

/// One entry of the ordered conversation history.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    UserText(String),
    AssistantText(String),
    AssistantToolCall {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },
    ToolResult {
        call_id: String,
        payload: ToolResultPayload,
    },
}

impl ConversationTurn {
    pub fn call_id(&self) -> Option<&str> {
        match self {
            ConversationTurn::AssistantToolCall { call_id, .. }
            | ConversationTurn::ToolResult { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}

/// A tool invocation as returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// What a backend produced for one request: free text or a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Text(String),
    ToolCall(ToolCall),
}
