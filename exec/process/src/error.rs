//! Error types for process supervision.

use std::io;

/// Errors raised while configuring or driving a [`crate::ProcessHandle`].
///
/// Execution outcomes (timeouts, non-zero exits, cancellation) are not
/// errors; they are reported through [`crate::CommandResult`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProcessError {
    /// The builder was given an unusable configuration.
    #[error("invalid process configuration: {0}")]
    Config(String),

    /// The executable could not be found or the OS refused to spawn it.
    #[error("failed to start `{program}`: {source}")]
    StartFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("process has already been started")]
    AlreadyStarted,

    #[error("process has not been started")]
    NotStarted,

    #[error("process was shut down")]
    ShutDown,

    /// Standard input was never piped or has been closed.
    #[error("standard input is not available")]
    StdinClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
