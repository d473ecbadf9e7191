//! Conversation engine: the turn-taking state machine of the assistant.
//!
//! The engine performs no I/O. The session loop calls a transition, does the
//! blocking work the result asks for (call the model, show suggestions, run a
//! command, read an answer) and feeds the outcome back through the next
//! transition. Every transition checks the current state first; calling one
//! from the wrong state is a defect in the caller and yields
//! `InvalidTransition` without touching history.
//!
//! ```text
//! Idle --submit_user_text--> AwaitingModel --receive_model_response--> Idle
//!                                 |                                      (text / nothing to run)
//!                                 +--> AwaitingSelection --none--> Idle
//!                                 |          |
//!                                 |        command
//!                                 |          v
//!                                 |    AwaitingExecution --result--> Idle
//!                                 +--> AwaitingClarification --answer--> AwaitingModel
//! ```

use std::fmt;

use crate::core_types::{
    CommandExecutionResult, CommandSuggestion, ConversationTurn, ModelResponse, ToolResultPayload,
};
use crate::errors::AssistantError;
use crate::llm::{ModelRequest, ToolMetadata};
use crate::prompts::system_prompt;
use crate::tools::{decode_suggest_response, suggest_commands_metadata};

pub mod history;

pub use history::ConversationHistory;

pub const DEFAULT_FOLLOW_UP_QUESTION: &str = "Could you provide more details?";
pub const SELECTION_CANCELLED_REASON: &str = "User cancelled the command selection";
pub const NO_COMMANDS_REASON: &str = "no commands were suggested";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingModel,
    AwaitingSelection,
    AwaitingExecution,
    AwaitingClarification,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Idle => "idle",
            EngineState::AwaitingModel => "awaiting a model response",
            EngineState::AwaitingSelection => "awaiting a command selection",
            EngineState::AwaitingExecution => "awaiting an execution result",
            EngineState::AwaitingClarification => "awaiting a clarification answer",
        };
        f.write_str(label)
    }
}

/// What the caller should do after a model response was folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Free text to show; the engine is idle again.
    Reply(String),
    /// Candidates for the presenter; the engine awaits a selection.
    Suggestions(Vec<CommandSuggestion>),
    /// Question to ask the user; the engine awaits the answer.
    Clarification(String),
    /// The model called the tool without commands or a question.
    NothingToRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Run this command and report back with `submit_execution_result`.
    Execute(String),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// The command failed; a corrective model turn is warranted.
    pub retry_recommended: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingCall {
    call_id: String,
    follow_up_question: Option<String>,
}

/// How the in-flight model request was started; decides what `abort_turn` undoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestOrigin {
    UserText { history_len: usize },
    Clarification,
    Correction,
}

#[derive(Debug, Clone)]
pub struct ConversationEngine {
    system_prompt: String,
    tools: Vec<ToolMetadata>,
    history: ConversationHistory,
    state: EngineState,
    pending_call: Option<PendingCall>,
    origin: Option<RequestOrigin>,
    correction_available: bool,
}

impl ConversationEngine {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            tools: vec![suggest_commands_metadata()],
            history: ConversationHistory::new(),
            state: EngineState::Idle,
            pending_call: None,
            origin: None,
            correction_available: false,
        }
    }

    pub fn for_shell(shell: &str) -> Self {
        Self::new(system_prompt(shell))
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.history.turns()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &[ToolMetadata] {
        &self.tools
    }

    pub fn pending_call_id(&self) -> Option<&str> {
        self.pending_call.as_ref().map(|call| call.call_id.as_str())
    }

    /// True right after a failed execution result, until any other transition.
    pub fn corrective_turn_available(&self) -> bool {
        self.state == EngineState::Idle && self.correction_available
    }

    /// Snapshot of what the backend needs for the next call.
    pub fn model_request(&self) -> ModelRequest {
        ModelRequest {
            system_prompt: self.system_prompt.clone(),
            history: self.history.turns().to_vec(),
            tools: self.tools.clone(),
        }
    }

    pub fn submit_user_text(&mut self, text: impl Into<String>) -> Result<ModelRequest, AssistantError> {
        self.expect_state(EngineState::Idle, "submit user text")?;

        let history_len = self.history.len();
        self.history.push(ConversationTurn::UserText(text.into()))?;
        self.enter_awaiting_model(RequestOrigin::UserText { history_len });
        Ok(self.model_request())
    }

    /// Fold a backend response into history.
    ///
    /// A tool call whose arguments do not decode yields `MalformedResponse` and
    /// leaves both history and state exactly as they were, so the caller can
    /// retry the request or `abort_turn`.
    pub fn receive_model_response(
        &mut self,
        response: ModelResponse,
    ) -> Result<ModelOutcome, AssistantError> {
        self.expect_state(EngineState::AwaitingModel, "receive a model response")?;

        let call = match response {
            ModelResponse::Text(text) => {
                self.history.push(ConversationTurn::AssistantText(text.clone()))?;
                self.enter_idle();
                log::info!("Model replied with text");
                return Ok(ModelOutcome::Reply(text));
            }
            ModelResponse::ToolCall(call) => call,
        };

        let decoded = decode_suggest_response(&call.name, &call.arguments)?;
        let tool_call = ConversationTurn::AssistantToolCall {
            call_id: call.id.clone(),
            tool_name: call.name,
            arguments: call.arguments,
        };

        if decoded.needs_more_info {
            let question = decoded
                .follow_up_question
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FOLLOW_UP_QUESTION.to_string());
            self.history.push(tool_call)?;
            self.pending_call = Some(PendingCall {
                call_id: call.id,
                follow_up_question: Some(question.clone()),
            });
            self.origin = None;
            self.state = EngineState::AwaitingClarification;
            log::info!("Model needs more information");
            return Ok(ModelOutcome::Clarification(question));
        }

        if decoded.commands.is_empty() {
            let cancellation = ConversationTurn::ToolResult {
                call_id: call.id,
                payload: ToolResultPayload::Cancelled {
                    reason: NO_COMMANDS_REASON.to_string(),
                },
            };
            self.history.extend(vec![tool_call, cancellation])?;
            self.enter_idle();
            log::info!("Model called the tool without any commands");
            return Ok(ModelOutcome::NothingToRun);
        }

        self.history.push(tool_call)?;
        self.pending_call = Some(PendingCall {
            call_id: call.id,
            follow_up_question: None,
        });
        self.origin = None;
        self.state = EngineState::AwaitingSelection;
        log::info!("Model suggested {} command(s)", decoded.commands.len());
        Ok(ModelOutcome::Suggestions(decoded.commands))
    }

    /// Record the presenter's answer. `None` is an explicit cancellation.
    pub fn submit_selection(
        &mut self,
        command: Option<String>,
    ) -> Result<SelectionOutcome, AssistantError> {
        self.expect_state(EngineState::AwaitingSelection, "submit a selection")?;

        match command {
            Some(command) => {
                self.state = EngineState::AwaitingExecution;
                Ok(SelectionOutcome::Execute(command))
            }
            None => {
                self.resolve_pending(ToolResultPayload::Cancelled {
                    reason: SELECTION_CANCELLED_REASON.to_string(),
                })?;
                self.enter_idle();
                log::info!("User cancelled the selection");
                Ok(SelectionOutcome::Cancelled)
            }
        }
    }

    pub fn submit_execution_result(
        &mut self,
        result: CommandExecutionResult,
    ) -> Result<ExecutionOutcome, AssistantError> {
        self.expect_state(EngineState::AwaitingExecution, "submit an execution result")?;

        let retry_recommended = !result.success;
        self.resolve_pending(ToolResultPayload::Execution(result))?;
        self.enter_idle();
        self.correction_available = retry_recommended;
        Ok(ExecutionOutcome { retry_recommended })
    }

    /// Commit the answer both as the tool result and as plain user text, then
    /// request the next model turn.
    pub fn submit_clarification_answer(
        &mut self,
        text: impl Into<String>,
    ) -> Result<ModelRequest, AssistantError> {
        self.expect_state(EngineState::AwaitingClarification, "submit a clarification answer")?;

        let text = text.into();
        let pending = self.pending_call.as_ref().ok_or(AssistantError::InvalidTransition {
            operation: "submit a clarification answer",
            state: self.state,
        })?;
        let result = ConversationTurn::ToolResult {
            call_id: pending.call_id.clone(),
            payload: ToolResultPayload::Clarification {
                follow_up_question: pending
                    .follow_up_question
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FOLLOW_UP_QUESTION.to_string()),
                user_response: text.clone(),
            },
        };

        self.history.extend(vec![result, ConversationTurn::UserText(text)])?;
        self.pending_call = None;
        self.enter_awaiting_model(RequestOrigin::Clarification);
        Ok(self.model_request())
    }

    /// Re-query the model after a failed command without new user text.
    pub fn begin_corrective_turn(&mut self) -> Result<ModelRequest, AssistantError> {
        if !self.corrective_turn_available() {
            return Err(AssistantError::InvalidTransition {
                operation: "begin a corrective turn",
                state: self.state,
            });
        }
        self.enter_awaiting_model(RequestOrigin::Correction);
        Ok(self.model_request())
    }

    /// Give up on the in-flight model request and return to `Idle`.
    ///
    /// The user text of an aborted user turn is removed again. Turns committed
    /// by a clarification answer or an execution result stay, since they
    /// already answer a tool call.
    pub fn abort_turn(&mut self) -> Result<(), AssistantError> {
        self.expect_state(EngineState::AwaitingModel, "abort the turn")?;

        if let Some(RequestOrigin::UserText { history_len }) = self.origin {
            self.history.truncate(history_len);
        }
        self.enter_idle();
        log::info!("Model turn aborted");
        Ok(())
    }

    /// Valid from any state: forget everything and return to `Idle`.
    pub fn clear(&mut self) {
        self.history.clear();
        self.pending_call = None;
        self.enter_idle();
        log::info!("Conversation cleared");
    }

    fn expect_state(&self, expected: EngineState, operation: &'static str) -> Result<(), AssistantError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AssistantError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn resolve_pending(&mut self, payload: ToolResultPayload) -> Result<(), AssistantError> {
        let pending = self.pending_call.as_ref().ok_or(AssistantError::InvalidTransition {
            operation: "resolve the pending tool call",
            state: self.state,
        })?;
        self.history.push(ConversationTurn::ToolResult {
            call_id: pending.call_id.clone(),
            payload,
        })?;
        self.pending_call = None;
        Ok(())
    }

    fn enter_awaiting_model(&mut self, origin: RequestOrigin) {
        self.state = EngineState::AwaitingModel;
        self.origin = Some(origin);
        self.correction_available = false;
    }

    fn enter_idle(&mut self) {
        self.state = EngineState::Idle;
        self.origin = None;
        self.correction_available = false;
    }
}
