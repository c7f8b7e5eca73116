//! Error Types
//!
//! Errors that can reach the session layer. Malformed frames and orphan
//! trace completions are recovered where they happen and never show up here;
//! only connection-level failures and configuration problems do.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while talking to the agent backend
#[derive(Debug, Error)]
pub enum ConductorError {
    /// The HTTP request could not be sent or the body could not be read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with something other than 200
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// The chunk stream broke for a reason other than an HTTP error
    ///
    /// The built-in backends never produce this; it is the error for
    /// `AgentBackend` implementations that are not HTTP based (in-process
    /// agents, channel-fed test doubles) to report a broken stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// Configuration was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConductorError {
    /// Short reason suitable for logs and `TurnOutcome::Failed`
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Status { status, .. } => format!("backend returned {status}"),
            other => other.to_string(),
        }
    }
}
