//! Language model backend abstraction.
//!
//! The engine never talks to a provider directly. It hands the session loop a
//! `ModelRequest` snapshot, the loop passes it to whichever `ModelBackend` was
//! selected at startup, and the backend's `ModelResponse` goes back into the
//! engine. Each provider owns the projection of typed history into its wire
//! format.

pub use crate::core_types::{ModelResponse, ToolCall};
use crate::core_types::ConversationTurn;
use crate::errors::AssistantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod providers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Everything a backend needs for one call: system prompt, full history, tool schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub history: Vec<ConversationTurn>,
    pub tools: Vec<ToolMetadata>,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns free text or exactly one tool call. Providers that return several
    /// tool calls keep the first one.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, AssistantError>;

    /// Short provider label used in logs.
    fn name(&self) -> &str;
}
