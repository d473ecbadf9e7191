//! Error types for the conversation engine and everything around it
//!
//! Failures are grouped by where they come from. Backend and malformed-response
//! errors leave the engine untouched and are shown to the user, while invalid
//! transitions and orphaned tool results point at a defect in the calling loop.
//! Command execution failures are never errors: they travel as data inside
//! `CommandExecutionResult`.

use std::fmt;

use thiserror::Error;

use crate::engine::EngineState;

/// Failure categories a model backend adapter maps its faults into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Missing, invalid or rejected credentials.
    Authentication,
    /// The provider throttled the request.
    RateLimited,
    /// The request never produced an HTTP response.
    Connection,
    /// The provider answered with something that could not be parsed.
    InvalidPayload,
    /// Any other provider-side fault.
    Api,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendErrorKind::Authentication => "authentication",
            BackendErrorKind::RateLimited => "rate limited",
            BackendErrorKind::Connection => "connection",
            BackendErrorKind::InvalidPayload => "invalid payload",
            BackendErrorKind::Api => "api",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistantError {
    #[error("Model backend error ({kind}): {message}")]
    Backend {
        kind: BackendErrorKind,
        message: String,
    },
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: EngineState,
    },
    #[error("Tool result references unknown call id '{0}'")]
    UnknownCallId(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(String),
}

impl AssistantError {
    pub fn backend(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        AssistantError::Backend {
            kind,
            message: message.into(),
        }
    }

    /// Whether the session may report this error and carry on with a fresh turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AssistantError::Backend { .. } | AssistantError::MalformedResponse(_)
        )
    }
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        AssistantError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            BackendErrorKind::InvalidPayload
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            BackendErrorKind::Connection
        } else {
            BackendErrorKind::Api
        };
        AssistantError::backend(kind, err.to_string())
    }
}
