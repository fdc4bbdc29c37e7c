//! Error types for the CodeForge core
//!
//! Every error here is recoverable: it ends the current run, command or
//! generation and hands control back to the user.

use thiserror::Error;

/// Failure talking to the backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure decoding the execution progress stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed progress frame: {0}")]
    MalformedFrame(String),

    #[error("progress frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure of an execution run as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Malformed(String),

    /// The executor reported an `error` event
    #[error("execution failed: {0}")]
    Protocol(String),

    #[error("no artifact to execute")]
    NoArtifact,
}

impl From<ProgressError> for ExecutionError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::Transport(t) => ExecutionError::Transport(t),
            other => ExecutionError::Malformed(other.to_string()),
        }
    }
}

/// Failure of a terminal command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminalError {
    #[error("a command is already running")]
    Busy,

    #[error("empty command")]
    EmptyCommand,

    #[error("no sandbox yet - execute an artifact first")]
    NoSandbox,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure of a generation request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("a response is already being generated")]
    Busy,

    #[error("empty prompt")]
    EmptyPrompt,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Main error type for the CodeForge core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_error_maps_to_execution_error() {
        let transport = TransportError::Connection("reset by peer".to_string());
        assert_eq!(
            ExecutionError::from(ProgressError::Transport(transport.clone())),
            ExecutionError::Transport(transport)
        );

        let malformed = ExecutionError::from(ProgressError::MalformedFrame("data: {".to_string()));
        assert_eq!(
            malformed,
            ExecutionError::Malformed("malformed progress frame: data: {".to_string())
        );
    }

    #[test]
    fn test_core_error_wraps_each_concern() {
        fn busy() -> Result<()> {
            Err(TerminalError::Busy)?
        }

        assert_eq!(busy(), Err(CoreError::Terminal(TerminalError::Busy)));
        assert_eq!(
            CoreError::from(GenerationError::EmptyPrompt).to_string(),
            "empty prompt"
        );
        assert_eq!(
            CoreError::from(ExecutionError::NoArtifact).to_string(),
            "no artifact to execute"
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = TransportError::Status {
            status: 404,
            message: "Sandbox not found".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 404: Sandbox not found");
    }
}
