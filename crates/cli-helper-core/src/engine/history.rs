//! Ordered conversation history with tool-call correlation checks.
//!
//! A `ToolResult` may only be appended when an `AssistantToolCall` with the same
//! call id is already in the buffer (or earlier in the same batch). Appends are
//! all-or-nothing: a batch that fails the check leaves the buffer untouched.

use crate::core_types::ConversationTurn;
use crate::errors::AssistantError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: ConversationTurn) -> Result<(), AssistantError> {
        self.extend(vec![turn])
    }

    /// Append several turns atomically.
    pub fn extend(&mut self, turns: Vec<ConversationTurn>) -> Result<(), AssistantError> {
        for (offset, turn) in turns.iter().enumerate() {
            if let ConversationTurn::ToolResult { call_id, .. } = turn {
                let known = self.has_tool_call(call_id)
                    || turns[..offset].iter().any(|earlier| is_tool_call_with_id(earlier, call_id));
                if !known {
                    return Err(AssistantError::UnknownCallId(call_id.clone()));
                }
            }
        }
        self.turns.extend(turns);
        Ok(())
    }

    pub fn has_tool_call(&self, call_id: &str) -> bool {
        self.turns.iter().any(|turn| is_tool_call_with_id(turn, call_id))
    }

    /// Drop every turn from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

fn is_tool_call_with_id(turn: &ConversationTurn, call_id: &str) -> bool {
    matches!(turn, ConversationTurn::AssistantToolCall { call_id: id, .. } if id == call_id)
}
