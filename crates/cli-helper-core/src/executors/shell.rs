use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::CommandRunner;
use crate::config::RunnerConfig;
use crate::core_types::CommandExecutionResult;
use crate::shell::UNKNOWN_SHELL;

/// Runs a command line through `<shell> -c`, capturing both output streams.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
    timeout: Duration,
}

impl ShellCommandRunner {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    /// `shell` is the detected user shell, used when the config names none.
    pub fn from_config(config: &RunnerConfig, shell: &str) -> Self {
        let shell = match &config.shell {
            Some(configured) => configured.clone(),
            None if shell == UNKNOWN_SHELL => "sh".to_string(),
            None => shell.to_string(),
        };
        Self::new(shell, Duration::from_secs(config.timeout_seconds))
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> CommandExecutionResult {
        log::debug!("Running '{}' with {}", command, self.shell);

        let mut std_cmd = std::process::Command::new(&self.shell);
        std_cmd
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout can take down every descendant.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let child = Command::from(std_cmd).kill_on_drop(true).spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to start '{}' with {}: {}", command, self.shell, e);
                return CommandExecutionResult::spawn_failure(command);
            }
        };

        let pgid = child.id().map(|pid| pid as i32);

        let finished = if self.timeout.is_zero() {
            Ok(child.wait_with_output().await)
        } else {
            tokio::time::timeout(self.timeout, child.wait_with_output()).await
        };

        match finished {
            Ok(Ok(output)) => {
                log::info!("'{}' exited with {}", command, output.status);
                CommandExecutionResult {
                    command: command.to_string(),
                    stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                    success: output.status.success(),
                }
            }
            Ok(Err(e)) => {
                log::error!("Failed to collect output of '{}': {}", command, e);
                CommandExecutionResult::spawn_failure(command)
            }
            Err(_) => {
                log::warn!("'{}' timed out after {}s", command, self.timeout.as_secs());
                kill_process_group(pgid);
                CommandExecutionResult {
                    command: command.to_string(),
                    stdout: Some(String::new()),
                    stderr: Some(format!(
                        "Command execution timed out after {}s",
                        self.timeout.as_secs()
                    )),
                    success: false,
                }
            }
        }
    }
}

/// SIGKILL to every process the command started, not just the shell.
#[cfg(unix)]
fn kill_process_group(pgid: Option<i32>) {
    if let Some(pgid) = pgid {
        log::debug!("Killing process group {}", pgid);
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<i32>) {}
