//! Command execution for commands the user picked.
//!
//! A runner never fails: a command that exits non-zero, times out or cannot be
//! started is reported through `CommandExecutionResult` so the model can react
//! to it on its next turn.

use async_trait::async_trait;

use crate::core_types::CommandExecutionResult;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandExecutionResult;
}

pub mod shell;

pub use shell::ShellCommandRunner;
