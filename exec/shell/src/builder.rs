//! Fluent configuration for [`PersistentShell`].

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shellkit_process::CommandResult;
use shellkit_process::ConsoleVerbosity;
use shellkit_process::DEFAULT_TIMEOUT;
use shellkit_process::ProcessBuilder;
use shellkit_process::ProcessCallbacks;
use shellkit_process::TimeoutStrategy;
use shellkit_process::VerbosityFlag;

use crate::config::ShellConfig;
use crate::error::Result;
use crate::error::ShellError;
use crate::flavor::ShellFlavor;
use crate::marker::MarkerProtocol;
use crate::marker::new_marker;
use crate::persistent::EngineSettings;
use crate::persistent::PersistentShell;
use crate::persistent::ShellCommand;
use crate::shell_types::Shell;
use crate::shell_types::ShellType;
use crate::shell_types::default_shell_for;
use crate::shell_types::get_shell;
use crate::shell_types::get_shell_by_path;
use crate::shell_types::resolve_path;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`PersistentShell`].
///
/// ```no_run
/// use shellkit_shell::PersistentShellBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), shellkit_shell::ShellError> {
/// let shell = PersistentShellBuilder::new()
///     .current_dir("/project")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// let result = shell.execute("cargo --version").await;
/// println!("{}", result.stdout);
/// shell.shutdown(true).await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PersistentShellBuilder {
    flavor: ShellFlavor,
    shell_type: Option<ShellType>,
    executable: Option<PathBuf>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    settings: EngineSettings,
    callbacks: ProcessCallbacks,
    verbosity: Option<Arc<dyn ConsoleVerbosity>>,
}

impl Default for PersistentShellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentShellBuilder {
    pub fn new() -> Self {
        Self {
            flavor: ShellFlavor::platform_default(),
            shell_type: None,
            executable: None,
            current_dir: None,
            env: BTreeMap::new(),
            settings: EngineSettings {
                default_timeout: DEFAULT_TIMEOUT,
                timeout_strategy: TimeoutStrategy::default(),
                poll_interval: DEFAULT_POLL_INTERVAL,
                verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
            },
            callbacks: ProcessCallbacks::default(),
            verbosity: None,
        }
    }

    /// Applies the engine settings from a loaded config file.
    pub fn from_config(config: &ShellConfig) -> Self {
        let mut builder = Self::new()
            .timeout(config.default_timeout)
            .timeout_strategy(config.timeout_strategy)
            .poll_interval(config.poll_interval)
            .verification_timeout(config.verification_timeout)
            .verbosity(Arc::new(VerbosityFlag::new(config.verbose)));
        if let Some(flavor) = config.default_flavor {
            builder = builder.flavor(flavor);
        }
        builder
    }

    /// Any shell of this flavor. Cleared by [`PersistentShellBuilder::shell_type`].
    pub fn flavor(mut self, flavor: ShellFlavor) -> Self {
        self.flavor = flavor;
        self.shell_type = None;
        self
    }

    pub fn shell_type(mut self, shell_type: ShellType) -> Self {
        self.flavor = shell_type.flavor();
        self.shell_type = Some(shell_type);
        self
    }

    /// Uses this executable instead of searching `PATH`. Without an explicit
    /// [`PersistentShellBuilder::shell_type`] the type is inferred from the
    /// file name.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Default per-command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.default_timeout = timeout;
        self
    }

    pub fn timeout_strategy(mut self, strategy: TimeoutStrategy) -> Self {
        self.settings.timeout_strategy = strategy;
        self
    }

    /// How often captured output is checked for the completion marker.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    pub fn verification_timeout(mut self, timeout: Duration) -> Self {
        self.settings.verification_timeout = timeout;
        self
    }

    pub fn callbacks(mut self, callbacks: ProcessCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn verbosity(mut self, verbosity: Arc<dyn ConsoleVerbosity>) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Resolves the executable and returns an unstarted shell.
    pub fn build(self) -> Result<PersistentShell> {
        if self.settings.default_timeout.is_zero() {
            return Err(ShellError::Config("timeout must be positive".to_string()));
        }
        if self.settings.poll_interval.is_zero() {
            return Err(ShellError::Config(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.settings.verification_timeout.is_zero() {
            return Err(ShellError::Config(
                "verification timeout must be positive".to_string(),
            ));
        }

        let shell = self.resolve_shell()?;
        let mut process = ProcessBuilder::new(shell.shell_path.to_string_lossy())
            .args(shell.startup_args())
            .envs(self.env)
            .keep_stdin_open(true)
            .no_timeout()
            .callbacks(self.callbacks);
        if let Some(dir) = self.current_dir {
            process = process.current_dir(dir);
        }
        if let Some(verbosity) = self.verbosity {
            process = process.verbosity(verbosity);
        }
        let process = process.build()?;

        let protocol = MarkerProtocol::new(new_marker())
            .map_err(|err| ShellError::Config(format!("invalid completion marker: {err}")))?;
        tracing::debug!(shell = %shell.shell_path.display(), "Built persistent shell");
        Ok(PersistentShell::new(shell, process, protocol, self.settings))
    }

    /// Builds a shell, runs one command in it and kills the shell.
    pub async fn run(self, command: &str) -> Result<CommandResult> {
        self.run_with(ShellCommand::new(command)).await
    }

    pub async fn run_with(self, command: ShellCommand) -> Result<CommandResult> {
        let shell = self.build()?;
        let result = shell.execute_with(command).await;
        shell.force_shutdown();
        Ok(result)
    }

    fn resolve_shell(&self) -> Result<Shell> {
        match (&self.executable, self.shell_type) {
            (Some(path), Some(shell_type)) => resolve_path(path)
                .map(|shell_path| Shell {
                    shell_type,
                    shell_path,
                })
                .ok_or_else(|| unresolvable(path)),
            (Some(path), None) => get_shell_by_path(path).ok_or_else(|| unresolvable(path)),
            (None, Some(shell_type)) => {
                get_shell(shell_type, None).ok_or(ShellError::ExecutableNotFound(self.flavor))
            }
            (None, None) => {
                default_shell_for(self.flavor).ok_or(ShellError::ExecutableNotFound(self.flavor))
            }
        }
    }
}

fn unresolvable(path: &Path) -> ShellError {
    ShellError::Config(format!(
        "cannot resolve shell executable {}",
        path.display()
    ))
}

#[cfg(test)]
#[path = "builder.test.rs"]
mod tests;
