//! Tools offered to the model
//!
//! The helper exposes exactly one tool. The engine never executes it: a call is
//! decoded into command suggestions or a clarification request and handed to
//! the human.

pub mod suggest_commands;

pub use suggest_commands::{decode_suggest_response, suggest_commands_metadata, SUGGEST_COMMANDS_TOOL};
