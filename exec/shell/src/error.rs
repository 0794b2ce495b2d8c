//! Error types for persistent shells and the shell registry.

use std::io;
use std::path::PathBuf;

use shellkit_process::FailureKind;
use shellkit_process::ProcessError;

use crate::flavor::ShellFlavor;

/// Errors that fail an operation outright.
///
/// Command outcomes, including timeouts and syntax errors, are reported as
/// [`shellkit_process::CommandResult`] values instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShellError {
    /// The builder or config was given an unusable value.
    #[error("invalid shell configuration: {0}")]
    Config(String),

    #[error("no executable found for the {0} shell")]
    ExecutableNotFound(ShellFlavor),

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The shell did not answer its startup check.
    #[error("shell verification failed: {0}")]
    VerificationFailed(String),

    #[error("shell '{0}' already exists")]
    AlreadyExists(String),

    #[error("shell '{0}' not found")]
    NotFound(String),

    #[error("shell '{name}' is busy executing: {command}")]
    Busy { name: String, command: String },

    #[error("working directory does not exist: {}", .0.display())]
    InvalidWorkingDirectory(PathBuf),

    #[error("invalid environment variable name: {0:?}")]
    InvalidEnvKey(String),

    /// A working-directory or environment setup command failed.
    #[error("shell setup failed: {0}")]
    SetupFailed(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ShellError {
    /// The result classification used when this error is turned into a
    /// command result.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ShellError::Process(ProcessError::StartFailure { .. })
            | ShellError::ExecutableNotFound(_) => FailureKind::StartFailure,
            ShellError::VerificationFailed(_) => FailureKind::VerificationFailed,
            ShellError::NotFound(_) => FailureKind::NotFound,
            ShellError::Busy { .. } => FailureKind::Busy,
            ShellError::Process(ProcessError::ShutDown) => FailureKind::ShellExited,
            _ => FailureKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
