//! Interactive session loop around the conversation engine.
//!
//! The session performs the I/O the engine asks for: it calls the model
//! backend, shows suggestions, runs the chosen command and reads the next line
//! from the terminal. Backend and malformed-response errors are printed and the
//! turn is dropped; any other error ends the session.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::SessionConfig;
use crate::core_types::CommandExecutionResult;
use crate::engine::{ConversationEngine, ModelOutcome, SelectionOutcome};
use crate::errors::AssistantError;
use crate::executors::CommandRunner;
use crate::llm::{ModelBackend, ModelRequest};
use crate::presenter::SuggestionPresenter;
use crate::terminal::Terminal;

pub const WELCOME_BANNER: [&str; 2] = [
    "Welcome to LLM CLI Helper! (Type 'exit' to quit)",
    "Type 'clear' to start a new conversation",
];
pub const INPUT_PROMPT: &str = "What would you like to do? > ";
pub const CLARIFICATION_PROMPT: &str = "> ";

const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK_INTERVAL: Duration = Duration::from_millis(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// What the user typed at the clarification prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClarificationInput {
    Answer(String),
    Clear,
    Exit,
}

pub struct Session<T: Terminal> {
    engine: ConversationEngine,
    backend: Arc<dyn ModelBackend>,
    runner: Arc<dyn CommandRunner>,
    presenter: Box<dyn SuggestionPresenter>,
    terminal: T,
    config: SessionConfig,
    styled: bool,
}

impl<T: Terminal> Session<T> {
    pub fn new(
        engine: ConversationEngine,
        backend: Arc<dyn ModelBackend>,
        runner: Arc<dyn CommandRunner>,
        presenter: Box<dyn SuggestionPresenter>,
        terminal: T,
        config: SessionConfig,
    ) -> Self {
        Self {
            engine,
            backend,
            runner,
            presenter,
            terminal,
            config,
            styled: false,
        }
    }

    /// Colored output and a progress spinner while the model is working.
    pub fn with_styling(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Run until the user exits or input ends. `initial_question` is handled
    /// as if it had been typed at the first prompt.
    pub async fn run(&mut self, initial_question: Option<String>) -> Result<(), AssistantError> {
        for line in WELCOME_BANNER {
            self.terminal.write_line(line)?;
        }
        log::info!("Session started with backend '{}'", self.backend.name());

        let mut queued = initial_question;
        loop {
            let input = match queued.take() {
                Some(question) => question,
                None => {
                    self.terminal.write_line("")?;
                    match self.terminal.read_line(INPUT_PROMPT)? {
                        Some(line) => line,
                        None => break,
                    }
                }
            };

            let trimmed = input.trim();
            if is_exit(trimmed) {
                break;
            }
            if trimmed.eq_ignore_ascii_case("clear") {
                self.engine.clear();
                self.terminal.write_line("Conversation history cleared!")?;
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }

            let request = self.engine.submit_user_text(input)?;
            if self.drive_turn(request).await? == Flow::Exit {
                break;
            }
        }

        log::info!("Session ended");
        Ok(())
    }

    /// Work one user turn to completion, including clarification rounds and
    /// corrective turns after failed commands.
    async fn drive_turn(&mut self, mut request: ModelRequest) -> Result<Flow, AssistantError> {
        let mut corrections_left = if self.config.auto_retry_failed_commands {
            self.config.max_corrective_turns
        } else {
            0
        };

        loop {
            let outcome = match self.query_model(&request).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_recoverable() => {
                    log::warn!("Dropping turn: {}", e);
                    let message = self.error_text(&format!("An error occurred: {}", e));
                    self.terminal.write_line(&message)?;
                    self.engine.abort_turn()?;
                    return Ok(Flow::Continue);
                }
                Err(e) => return Err(e),
            };

            match outcome {
                ModelOutcome::Reply(text) => {
                    self.terminal.write_line(&text)?;
                    return Ok(Flow::Continue);
                }
                ModelOutcome::NothingToRun => {
                    self.terminal.write_line("No commands were suggested.")?;
                    return Ok(Flow::Continue);
                }
                ModelOutcome::Clarification(question) => {
                    self.terminal.write_line(&question)?;
                    match self.read_clarification()? {
                        ClarificationInput::Answer(answer) => {
                            request = self.engine.submit_clarification_answer(answer)?;
                        }
                        ClarificationInput::Clear => {
                            self.engine.clear();
                            self.terminal.write_line("Conversation history cleared!")?;
                            return Ok(Flow::Continue);
                        }
                        ClarificationInput::Exit => return Ok(Flow::Exit),
                    }
                }
                ModelOutcome::Suggestions(suggestions) => {
                    let choice = self.presenter.present(&suggestions, &mut self.terminal)?;
                    let command = match self.engine.submit_selection(choice)? {
                        SelectionOutcome::Execute(command) => command,
                        SelectionOutcome::Cancelled => return Ok(Flow::Continue),
                    };

                    let result = self.execute(&command).await?;
                    let outcome = self.engine.submit_execution_result(result)?;
                    if !outcome.retry_recommended || corrections_left == 0 {
                        return Ok(Flow::Continue);
                    }
                    corrections_left -= 1;
                    log::info!("'{}' failed, asking the model for a correction", command);
                    request = self.engine.begin_corrective_turn()?;
                }
            }
        }
    }

    async fn query_model(&mut self, request: &ModelRequest) -> Result<ModelOutcome, AssistantError> {
        log::debug!("Sending {} turn(s) to {}", request.history.len(), self.backend.name());
        let spinner = self.styled.then(start_spinner);
        let response = self.backend.generate(request).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        self.engine.receive_model_response(response?)
    }

    /// Next non-blank line at the clarification prompt. End of input counts
    /// as exit.
    fn read_clarification(&mut self) -> Result<ClarificationInput, AssistantError> {
        loop {
            let Some(line) = self.terminal.read_line(CLARIFICATION_PROMPT)? else {
                return Ok(ClarificationInput::Exit);
            };
            let trimmed = line.trim();
            if is_exit(trimmed) {
                return Ok(ClarificationInput::Exit);
            }
            if trimmed.eq_ignore_ascii_case("clear") {
                return Ok(ClarificationInput::Clear);
            }
            if !trimmed.is_empty() {
                return Ok(ClarificationInput::Answer(line));
            }
        }
    }

    fn error_text(&self, text: &str) -> String {
        if self.styled {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    async fn execute(&mut self, command: &str) -> Result<CommandExecutionResult, AssistantError> {
        let marker = if self.styled {
            ">>".green().bold().to_string()
        } else {
            ">>".to_string()
        };
        self.terminal.write_line(&format!("{} {}", marker, command))?;
        let result = self.runner.run(command).await;

        if result.runner_failed() {
            let message =
                self.error_text(&format!("Error executing command: could not start '{}'", command));
            self.terminal.write_line(&message)?;
            return Ok(result);
        }
        if let Some(stdout) = result.stdout.as_deref() {
            self.terminal.write_line(stdout.trim_end_matches('\n'))?;
        }
        if let Some(stderr) = result.stderr.as_deref().filter(|s| !s.is_empty()) {
            let message = self.error_text(&format!("Error: {}", stderr.trim_end_matches('\n')));
            self.terminal.write_line(&message)?;
        }
        Ok(result)
    }
}

/// Spinner on stderr; indicatif hides it when stderr is not a terminal.
fn start_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().tick_strings(SPINNER_CHARS));
    pb.set_message("Thinking...".green().bold().to_string());
    pb.enable_steady_tick(TICK_INTERVAL);
    pb
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
