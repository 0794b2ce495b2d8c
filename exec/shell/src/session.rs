//! Caller-owned shell sessions that return plain text.
//!
//! A [`ShellSession`] keeps one lazily started shell per flavor, so state
//! such as the working directory and exported variables carries over between
//! calls. Calls for the same flavor run one at a time. Results are
//! flattened into the strings a tool caller shows.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::time::Duration;

use shellkit_process::CommandResult;
use shellkit_process::CompletionState;
use shellkit_process::FailureKind;
use tokio::sync::Mutex as AsyncMutex;

use crate::builder::PersistentShellBuilder;
use crate::config::ShellConfig;
use crate::flavor::ShellFlavor;
use crate::persistent::PersistentShell;
use crate::persistent::ShellCommand;

/// Returned after a timeout killed the session's shell.
pub const TIMEOUT_RESET_MESSAGE: &str =
    "<timed out and killed process - environment state has been reset>";

#[derive(Debug, Default)]
pub struct ShellSession {
    config: ShellConfig,
    shells: StdMutex<HashMap<ShellFlavor, Arc<PersistentShell>>>,
    /// Held for the whole of a command, so concurrent callers queue per flavor.
    turns: StdMutex<HashMap<ShellFlavor, Arc<AsyncMutex<()>>>>,
}

impl ShellSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ShellConfig) -> Self {
        Self {
            config,
            shells: StdMutex::new(HashMap::new()),
            turns: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn run_bash_command(&self, command: &str, timeout: Option<Duration>) -> String {
        self.run(ShellFlavor::Posix, command, timeout).await
    }

    pub async fn run_cmd_command(&self, command: &str, timeout: Option<Duration>) -> String {
        self.run(ShellFlavor::Cmd, command, timeout).await
    }

    pub async fn run_powershell_command(&self, command: &str, timeout: Option<Duration>) -> String {
        self.run(ShellFlavor::PowerShell, command, timeout).await
    }

    /// Runs `command` in the flavor's session and renders the outcome.
    ///
    /// The literal `exit` ends the session instead of being sent to the
    /// shell.
    pub async fn run(&self, flavor: ShellFlavor, command: &str, timeout: Option<Duration>) -> String {
        if command.trim() == "exit" {
            self.reset(flavor).await;
            return format!("<{flavor} session terminated>");
        }
        let result = self.execute(flavor, command, timeout).await;
        render(&result)
    }

    /// Structured variant of [`ShellSession::run`]. A timed-out or dead
    /// shell is discarded so the next call starts a fresh one.
    pub async fn execute(
        &self,
        flavor: ShellFlavor,
        command: &str,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let turn = self.turn_for(flavor);
        let _turn = turn.lock().await;
        let shell = match self.shell_for(flavor) {
            Ok(shell) => shell,
            Err(err) => {
                tracing::warn!("Failed to create {flavor} session: {err}");
                return CommandResult::error(err.failure_kind(), err.to_string(), Duration::ZERO);
            }
        };

        let mut request = ShellCommand::new(command);
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        let result = shell.execute_with(request).await;

        let fatal = result.is_timed_out()
            || !shell.is_alive()
            || matches!(
                result.failure,
                Some(FailureKind::ShellExited | FailureKind::VerificationFailed)
            );
        if fatal {
            tracing::debug!(%flavor, state = ?result.state, "Resetting session");
            self.discard(flavor, &shell);
        }
        result
    }

    /// Shuts the flavor's shell down; the next command starts a new one.
    pub async fn reset(&self, flavor: ShellFlavor) {
        let turn = self.turn_for(flavor);
        let _turn = turn.lock().await;
        let shell = self.lock().remove(&flavor);
        if let Some(shell) = shell {
            shell.shutdown(true).await;
        }
    }

    /// Shuts every session down.
    pub fn close(&self) {
        for (_, shell) in self.lock().drain() {
            shell.force_shutdown();
        }
    }

    pub fn has_session(&self, flavor: ShellFlavor) -> bool {
        self.lock().contains_key(&flavor)
    }

    fn shell_for(&self, flavor: ShellFlavor) -> crate::error::Result<Arc<PersistentShell>> {
        let mut shells = self.lock();
        if let Some(shell) = shells.get(&flavor) {
            return Ok(Arc::clone(shell));
        }
        let shell = Arc::new(
            PersistentShellBuilder::from_config(&self.config)
                .flavor(flavor)
                .build()?,
        );
        shells.insert(flavor, Arc::clone(&shell));
        Ok(shell)
    }

    fn turn_for(&self, flavor: ShellFlavor) -> Arc<AsyncMutex<()>> {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(turns.entry(flavor).or_default())
    }

    fn discard(&self, flavor: ShellFlavor, shell: &Arc<PersistentShell>) {
        let mut shells = self.lock();
        if shells
            .get(&flavor)
            .is_some_and(|current| Arc::ptr_eq(current, shell))
        {
            shells.remove(&flavor);
        }
        shell.force_shutdown();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ShellFlavor, Arc<PersistentShell>>> {
        self.shells.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Text shown to the caller for one command.
pub(crate) fn render(result: &CommandResult) -> String {
    match result.state {
        CompletionState::TimedOut => TIMEOUT_RESET_MESSAGE.to_string(),
        CompletionState::Canceled => "<command canceled>".to_string(),
        CompletionState::Error => result
            .failure_message()
            .unwrap_or_else(|| result.merged.clone()),
        CompletionState::Completed => {
            let mut text = result.merged.clone();
            if result.exit_code != 0 {
                text.push_str(&format!("\nExit code: {}", result.exit_code));
            }
            if let Some(diagnostic) = &result.diagnostic {
                text.push('\n');
                text.push_str(diagnostic);
            }
            text
        }
    }
}

#[cfg(test)]
#[path = "session.test.rs"]
mod tests;
