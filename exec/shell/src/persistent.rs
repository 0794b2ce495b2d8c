//! A long-lived interactive shell driven through the completion-marker
//! protocol.
//!
//! The shell process is started lazily and verified once. Each command is
//! wrapped by its [`ShellFlavor`] so the shell prints `<marker><status>` when
//! it finishes; the engine polls the captured stdout for that line, then
//! strips it and classifies the outcome into a [`CommandResult`].

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use shellkit_async_utils::sleep_or_cancel;
use shellkit_process::CapturedOutput;
use shellkit_process::CommandResult;
use shellkit_process::FailureKind;
use shellkit_process::ProcessHandle;
use shellkit_process::ProcessState;
use shellkit_process::TimeoutStrategy;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::error::ShellError;
use crate::flavor::ShellFlavor;
use crate::marker::AbortKind;
use crate::marker::MarkerProtocol;
use crate::marker::classify_abort;
use crate::shell_types::Shell;

/// How long a graceful shutdown waits for the shell to exit on its own.
pub const GRACEFUL_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

/// One command for a [`PersistentShell`].
#[derive(Debug, Clone, Default)]
pub struct ShellCommand {
    pub command: String,
    /// Overrides the shell's default timeout.
    pub timeout: Option<Duration>,
    pub stdin: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl From<&str> for ShellCommand {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for ShellCommand {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}

/// Tunables copied out of the builder.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EngineSettings {
    pub(crate) default_timeout: Duration,
    pub(crate) timeout_strategy: TimeoutStrategy,
    pub(crate) poll_interval: Duration,
    pub(crate) verification_timeout: Duration,
}

/// An interactive shell that runs one command at a time.
///
/// Callers must not run commands concurrently on the same instance; the
/// registry enforces this with its busy table. A timed-out command kills the
/// shell, any other outcome leaves it usable.
#[derive(Debug)]
pub struct PersistentShell {
    shell: Shell,
    process: ProcessHandle,
    protocol: MarkerProtocol,
    settings: EngineSettings,
    start_lock: Mutex<()>,
    verified: AtomicBool,
    /// Markers of canceled commands that have not been printed yet.
    stale_markers: AtomicUsize,
}

impl PersistentShell {
    pub(crate) fn new(
        shell: Shell,
        process: ProcessHandle,
        protocol: MarkerProtocol,
        settings: EngineSettings,
    ) -> Self {
        Self {
            shell,
            process,
            protocol,
            settings,
            start_lock: Mutex::new(()),
            verified: AtomicBool::new(false),
            stale_markers: AtomicUsize::new(0),
        }
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn flavor(&self) -> ShellFlavor {
        self.shell.flavor()
    }

    pub fn marker(&self) -> &str {
        self.protocol.marker()
    }

    pub fn default_timeout(&self) -> Duration {
        self.settings.default_timeout
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    /// True until the shell process exits or is shut down.
    pub fn is_alive(&self) -> bool {
        match self.process.state() {
            ProcessState::Created => true,
            ProcessState::Running => true,
            ProcessState::Exited(_) => false,
        }
    }

    pub fn stale_marker_count(&self) -> usize {
        self.stale_markers.load(Ordering::SeqCst)
    }

    /// Starts the shell and runs the verification command, once.
    ///
    /// A shell that fails verification is killed.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.is_verified() {
            return Ok(());
        }
        let _guard = self.start_lock.lock().await;
        if self.is_verified() {
            return Ok(());
        }
        if self.process.state() == ProcessState::Created {
            let pid = self.process.start().await?;
            tracing::info!(pid, shell = %self.shell.shell_path.display(), "Started persistent shell");
        }

        let flavor = self.flavor();
        let wrapped = flavor.wrap_command(flavor.verification_command(), None, self.marker())?;
        let result = self
            .run_marked(&wrapped, self.settings.verification_timeout, None)
            .await;
        if !result.success() {
            self.process.force_shutdown();
            let reason = result
                .failure_message()
                .unwrap_or_else(|| format!("exit code {}", result.exit_code));
            return Err(ShellError::VerificationFailed(reason));
        }
        self.verified.store(true, Ordering::SeqCst);
        tracing::debug!(pid = ?self.pid(), "Shell verified");
        Ok(())
    }

    /// Runs `command` with the default timeout.
    pub async fn execute(&self, command: &str) -> CommandResult {
        self.execute_with(ShellCommand::new(command)).await
    }

    /// Runs a command and waits for its completion marker.
    pub async fn execute_with(&self, command: ShellCommand) -> CommandResult {
        let started_at = Instant::now();
        if let Err(err) = self.ensure_ready().await {
            tracing::warn!("Failed to prepare {} shell: {err}", self.shell.name());
            return CommandResult::error(err.failure_kind(), err.to_string(), started_at.elapsed());
        }

        let wrapped = match self.flavor().wrap_command(
            &command.command,
            command.stdin.as_deref(),
            self.marker(),
        ) {
            Ok(wrapped) => wrapped,
            Err(err) => {
                return CommandResult::error(
                    FailureKind::Internal,
                    err.to_string(),
                    started_at.elapsed(),
                );
            }
        };

        let timeout = command.timeout.unwrap_or(self.settings.default_timeout);
        tracing::debug!(command = %command.command, ?timeout, "Executing in persistent shell");
        self.run_marked(&wrapped, timeout, command.cancel.as_ref())
            .await
    }

    async fn run_marked(
        &self,
        wrapped: &str,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> CommandResult {
        let pending = self.stale_markers.load(Ordering::SeqCst);
        let previous = self.process.take_outputs();
        let stale = pending.saturating_sub(self.protocol.count(&previous.stdout));

        let started_at = Instant::now();
        if let Err(err) = self.process.send_input(wrapped).await {
            tracing::warn!("Failed to write command to shell: {err}");
            return CommandResult::error(
                FailureKind::ShellExited,
                format!("shell is not accepting input: {err}"),
                started_at.elapsed(),
            );
        }

        loop {
            let exited = self.process.has_exited();
            let stdout = self.process.current_output();
            if self.protocol.find_completion(&stdout, stale).is_some() {
                // Let stderr catch up with the marker on stdout.
                tokio::time::sleep(self.settings.poll_interval).await;
                let output = self.process.snapshot();
                self.stale_markers.store(0, Ordering::SeqCst);
                return self.complete(output, stale, started_at.elapsed());
            }
            if exited {
                let code = self.process.exit_code().unwrap_or(-1);
                tracing::warn!(exit_code = code, "Shell exited while a command was running");
                return CommandResult::error_with_output(
                    FailureKind::ShellExited,
                    format!("shell exited unexpectedly with code {code}"),
                    self.partial_output(stale),
                    started_at.elapsed(),
                );
            }

            let deadline = self.settings.timeout_strategy.deadline(
                started_at,
                self.process.last_output_at(),
                timeout,
            );
            if Instant::now() >= deadline {
                return self.kill_on_timeout(stale, started_at.elapsed());
            }

            if sleep_or_cancel(self.settings.poll_interval, cancel)
                .await
                .is_err()
            {
                let elapsed = started_at.elapsed();
                return match classify_abort(elapsed, timeout) {
                    AbortKind::TimedOut => self.kill_on_timeout(stale, elapsed),
                    AbortKind::Canceled => {
                        tracing::debug!("Command canceled; shell left running");
                        self.stale_markers.store(stale + 1, Ordering::SeqCst);
                        CommandResult::canceled(self.partial_output(stale), elapsed)
                    }
                };
            }
        }
    }

    fn complete(&self, output: CapturedOutput, stale: usize, elapsed: Duration) -> CommandResult {
        let Some(completion) = self.protocol.find_completion(&output.stdout, stale) else {
            return CommandResult::error_with_output(
                FailureKind::Internal,
                "completion marker vanished from shell output",
                output,
                elapsed,
            );
        };
        let merged_start = self.protocol.output_start(&output.merged, stale).unwrap_or(0);
        let cleaned = CapturedOutput {
            stdout: self.protocol.strip(&output.stdout, completion.output_start),
            stderr: self.protocol.strip(&output.stderr, 0),
            merged: self.protocol.strip(&output.merged, merged_start),
        };

        let Some(exit_code) = completion.exit_code else {
            return CommandResult::completed(cleaned, -1, elapsed).with_diagnostic(
                FailureKind::ExitCodeParse,
                "could not parse the exit code reported by the shell",
            );
        };

        // Interpreters report parse failures on stderr; the exit code stays
        // whatever the shell reported.
        match self.flavor().detect_syntax_error(&cleaned.stderr) {
            Some(diagnostic) => {
                tracing::debug!(exit_code, "Syntax error detected: {diagnostic}");
                CommandResult::completed(cleaned, exit_code, elapsed)
                    .with_diagnostic(FailureKind::SyntaxError, diagnostic)
            }
            None => CommandResult::completed(cleaned, exit_code, elapsed),
        }
    }

    fn kill_on_timeout(&self, stale: usize, elapsed: Duration) -> CommandResult {
        tracing::warn!(pid = ?self.pid(), ?elapsed, "Command timed out; killing shell");
        self.process.force_shutdown();
        CommandResult::timed_out(self.partial_output(stale), elapsed)
    }

    /// Output captured so far, minus anything an earlier canceled command
    /// printed.
    fn partial_output(&self, stale: usize) -> CapturedOutput {
        let output = self.process.snapshot();
        let stdout_start = self
            .protocol
            .output_start(&output.stdout, stale)
            .unwrap_or(output.stdout.len());
        let merged_start = self
            .protocol
            .output_start(&output.merged, stale)
            .unwrap_or(output.merged.len());
        CapturedOutput {
            stdout: self.protocol.strip(&output.stdout, stdout_start),
            stderr: self.protocol.strip(&output.stderr, 0),
            merged: self.protocol.strip(&output.merged, merged_start),
        }
    }

    /// Kills the shell immediately. Idempotent.
    pub fn force_shutdown(&self) {
        self.process.force_shutdown();
    }

    /// Stops the shell. A graceful shutdown first asks the shell to exit and
    /// waits up to [`GRACEFUL_EXIT_TIMEOUT`].
    pub async fn shutdown(&self, graceful: bool) {
        if graceful && self.process.is_running() {
            let exit = format!("{}\n", self.flavor().exit_command());
            if self.process.send_input(&exit).await.is_ok()
                && let Some(code) = self.process.wait_for_exit_timeout(GRACEFUL_EXIT_TIMEOUT).await
            {
                tracing::debug!(exit_code = code, "Shell exited gracefully");
            }
        }
        self.process.force_shutdown();
    }
}

#[cfg(test)]
#[path = "persistent.test.rs"]
mod tests;
