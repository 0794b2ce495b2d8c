//! Fluent configuration for [`ProcessHandle`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::callbacks::ProcessCallbacks;
use crate::error::ProcessError;
use crate::error::Result;
use crate::handle::ProcessHandle;
use crate::handle::ProcessSpec;
use crate::result::CommandResult;
use crate::timeout::TimeoutStrategy;
use crate::verbosity::ConsoleVerbosity;

/// Default time budget for a process run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`ProcessHandle`].
///
/// ```no_run
/// use shellkit_process::ProcessBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), shellkit_process::ProcessError> {
/// let result = ProcessBuilder::new("git")
///     .arguments("log --oneline -n 5")
///     .current_dir("/project")
///     .timeout(Duration::from_secs(10))
///     .run()
///     .await?;
/// println!("{}", result.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    spec: ProcessSpec,
    invalid: Option<String>,
}

impl ProcessBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            spec: ProcessSpec {
                program: program.into(),
                args: Vec::new(),
                current_dir: None,
                env: BTreeMap::new(),
                stdin: None,
                keep_stdin_open: false,
                timeout: Some(DEFAULT_TIMEOUT),
                timeout_strategy: TimeoutStrategy::default(),
                cancellation: None,
                callbacks: ProcessCallbacks::default(),
                verbosity: None,
            },
            invalid: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.spec.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends arguments parsed from a single POSIX-style string.
    ///
    /// Unbalanced quotes are reported by [`ProcessBuilder::build`].
    pub fn arguments(mut self, line: &str) -> Self {
        match shlex::split(line) {
            Some(parts) => self.spec.args.extend(parts),
            None => self.invalid = Some(format!("unbalanced quotes in arguments: {line}")),
        }
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.current_dir = Some(dir.into());
        self
    }

    /// Sets one environment variable. A repeated key replaces the old value.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.spec
            .env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Text written to standard input right after spawn.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.spec.stdin = Some(input.into());
        self
    }

    /// Keep standard input open for [`ProcessHandle::send_input`].
    pub fn keep_stdin_open(mut self, keep: bool) -> Self {
        self.spec.keep_stdin_open = keep;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = Some(timeout);
        self
    }

    /// Let [`ProcessHandle::run`] wait indefinitely.
    pub fn no_timeout(mut self) -> Self {
        self.spec.timeout = None;
        self
    }

    pub fn timeout_strategy(mut self, strategy: TimeoutStrategy) -> Self {
        self.spec.timeout_strategy = strategy;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.spec.cancellation = Some(token);
        self
    }

    pub fn callbacks(mut self, callbacks: ProcessCallbacks) -> Self {
        self.spec.callbacks = callbacks;
        self
    }

    pub fn verbosity(mut self, verbosity: Arc<dyn ConsoleVerbosity>) -> Self {
        self.spec.verbosity = Some(verbosity);
        self
    }

    /// Validates the configuration and returns an unstarted handle.
    pub fn build(self) -> Result<ProcessHandle> {
        if let Some(reason) = self.invalid {
            return Err(ProcessError::Config(reason));
        }
        if self.spec.program.trim().is_empty() {
            return Err(ProcessError::Config("program must not be empty".to_string()));
        }
        if let Some(key) = self.spec.env.keys().find(|key| !is_valid_env_key(key)) {
            return Err(ProcessError::Config(format!(
                "invalid environment variable name: {key:?}"
            )));
        }
        if let Some(dir) = &self.spec.current_dir
            && !dir.is_dir()
        {
            return Err(ProcessError::Config(format!(
                "working directory does not exist: {}",
                dir.display()
            )));
        }
        if self.spec.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ProcessError::Config("timeout must be positive".to_string()));
        }
        Ok(ProcessHandle::new(self.spec))
    }

    /// Builds, starts and waits for the process.
    pub async fn run(self) -> Result<CommandResult> {
        let handle = self.build()?;
        Ok(handle.run().await)
    }

    /// Blocking variant of [`ProcessBuilder::run`] for synchronous callers.
    ///
    /// Spins up a private current-thread runtime, so it must not be called
    /// from inside an async context.
    pub fn run_blocking(self) -> Result<CommandResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }
}

/// Environment variable names must be non-empty and free of `=` and NUL.
pub fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}

#[cfg(test)]
#[path = "builder.test.rs"]
mod tests;
