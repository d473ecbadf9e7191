//! Core of an interactive command-line assistant.
//!
//! A language model proposes shell commands through a single
//! `suggest_commands` tool, the user picks one, it runs, and the result goes
//! back to the model as the answer to that tool call.
//!
//! # Architecture Overview
//!
//! - **Conversation engine**: state machine owning the typed, call-id
//!   correlated history; performs no I/O
//! - **Model backends**: OpenAI-compatible and Anthropic adapters behind one
//!   `ModelBackend` trait
//! - **Command execution**: `CommandRunner` running commands through the
//!   user's shell with a timeout
//! - **Presentation**: numbered selection of suggestions on a line terminal
//! - **Session loop**: drives the engine and performs the I/O it asks for
//! - **Configuration system**: YAML file with defaults and CLI overrides

pub mod config;
pub mod core_types;
pub mod engine;
pub mod errors;
pub mod executors;
pub mod llm;
pub mod presenter;
pub mod prompts;
pub mod session;
pub mod shell;
pub mod terminal;
pub mod tools;

pub use config::*;
pub use engine::{ConversationEngine, EngineState};
pub use errors::{AssistantError, BackendErrorKind};
pub use executors::{CommandRunner, ShellCommandRunner};
pub use llm::ModelBackend;
pub use presenter::{NumberedPresenter, SuggestionPresenter};
pub use session::Session;
pub use terminal::{StdTerminal, Terminal};

#[cfg(test)]
pub mod test_utils;
