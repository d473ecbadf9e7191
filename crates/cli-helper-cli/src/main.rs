use std::fs::OpenOptions;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use cli_helper_core::config::ConfigLoader;
use cli_helper_core::llm::providers::create_backend;
use cli_helper_core::shell::{detect_shell, is_supported_shell};
use cli_helper_core::{
    AssistantError, ConversationEngine, NumberedPresenter, Session, ShellCommandRunner,
    StdTerminal,
};
use dialoguer::{theme::ColorfulTheme, Confirm};
use log::LevelFilter;
use std::sync::Arc;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref()).await?;
    cli.apply_overrides(&mut config)?;

    let shell = detect_shell();
    if !is_supported_shell(&shell) {
        println!("Warning: Unsupported shell detected: {}", shell);
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Continue anyway?")
            .default(true)
            .interact()?;
        if !proceed {
            anyhow::bail!("Unsupported shell: {}", shell);
        }
    }

    let api_key = match ConfigLoader::resolve_api_key(&config.llm) {
        Ok(key) => key,
        Err(AssistantError::ConfigError(message)) => anyhow::bail!(message),
        Err(e) => return Err(e.into()),
    };

    let backend = create_backend(&config.llm, api_key)?;
    let runner = Arc::new(ShellCommandRunner::from_config(&config.runner, &shell));
    log::info!("Commands run through {}", runner.shell());

    let stdin = io::stdin();
    let terminal = StdTerminal::new(stdin.lock(), io::stdout());
    let mut session = Session::new(
        ConversationEngine::for_shell(&shell),
        backend,
        runner,
        Box::new(NumberedPresenter::new()),
        terminal,
        config.session.clone(),
    )
    .with_styling(io::stdout().is_terminal());

    session.run(cli.question.clone()).await?;
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli.log_level.parse().unwrap_or(LevelFilter::Warn);
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    // Keep the interactive output clean when a log file is given.
    if let Some(path) = &cli.log_file {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}
