//! Structured outcome of a command execution.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// The command ran to completion; see `exit_code`.
    Completed,
    /// The time budget elapsed and the process was killed.
    TimedOut,
    /// An external cancellation stopped the wait.
    Canceled,
    /// The command could not be run or its outcome could not be determined.
    Error,
}

/// Classification attached to results that are not plain successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StartFailure,
    Timeout,
    Canceled,
    /// The shell reported a syntax error. Informational; the shell survives.
    SyntaxError,
    /// The shell process died while a command was outstanding.
    ShellExited,
    /// The named shell already had a command in flight.
    Busy,
    /// No shell is registered under the requested name.
    NotFound,
    /// The completion marker was found but its exit code did not parse.
    ExitCodeParse,
    /// The shell failed its startup responsiveness check.
    VerificationFailed,
    Internal,
}

/// Captured text of a process at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Stdout and stderr interleaved in arrival order.
    pub merged: String,
}

/// Result of running a command, either as a standalone process or inside a
/// persistent shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub merged: String,
    /// Native exit status, or -1 when none is available.
    pub exit_code: i32,
    pub state: CompletionState,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Shell-specific diagnostic, e.g. a detected syntax error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Text of an error or panic caught while executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl CommandResult {
    pub fn completed(output: CapturedOutput, exit_code: i32, elapsed: Duration) -> Self {
        Self::from_parts(output, exit_code, CompletionState::Completed, elapsed)
    }

    /// Partial output is kept; the exit code is -1.
    pub fn timed_out(output: CapturedOutput, elapsed: Duration) -> Self {
        let mut result = Self::from_parts(output, -1, CompletionState::TimedOut, elapsed);
        result.failure = Some(FailureKind::Timeout);
        result
    }

    pub fn canceled(output: CapturedOutput, elapsed: Duration) -> Self {
        let mut result = Self::from_parts(output, -1, CompletionState::Canceled, elapsed);
        result.failure = Some(FailureKind::Canceled);
        result
    }

    /// An `Error` result whose stderr and exception carry `message`.
    pub fn error(kind: FailureKind, message: impl Into<String>, elapsed: Duration) -> Self {
        let message = message.into();
        let output = CapturedOutput {
            stdout: String::new(),
            stderr: message.clone(),
            merged: message.clone(),
        };
        let mut result = Self::from_parts(output, -1, CompletionState::Error, elapsed);
        result.failure = Some(kind);
        result.exception = Some(message);
        result
    }

    /// Like [`CommandResult::error`] but keeps whatever output was captured.
    pub fn error_with_output(
        kind: FailureKind,
        message: impl Into<String>,
        output: CapturedOutput,
        elapsed: Duration,
    ) -> Self {
        let mut result = Self::from_parts(output, -1, CompletionState::Error, elapsed);
        result.failure = Some(kind);
        result.exception = Some(message.into());
        result
    }

    pub fn with_diagnostic(mut self, kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        self.failure = Some(kind);
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// True for a completed command that exited 0.
    pub fn success(&self) -> bool {
        self.state == CompletionState::Completed && self.exit_code == 0
    }

    pub fn is_timed_out(&self) -> bool {
        self.state == CompletionState::TimedOut
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.duration_ms).unwrap_or(0))
    }

    /// Human-readable description of the failure, if any.
    pub fn failure_message(&self) -> Option<String> {
        match self.state {
            CompletionState::Completed => self.diagnostic.clone(),
            CompletionState::TimedOut => Some(format!(
                "Command timed out after {}ms",
                self.duration_ms
            )),
            CompletionState::Canceled => Some("Command was canceled".to_string()),
            CompletionState::Error => self
                .exception
                .clone()
                .or_else(|| Some("Command failed".to_string())),
        }
    }

    fn from_parts(
        output: CapturedOutput,
        exit_code: i32,
        state: CompletionState,
        elapsed: Duration,
    ) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            merged: output.merged,
            exit_code,
            state,
            duration_ms: duration_to_millis(elapsed),
            failure: None,
            diagnostic: None,
            exception: None,
        }
    }
}

pub(crate) fn duration_to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "result.test.rs"]
mod tests;
