//! Named shell registry.
//!
//! [`ShellManager`] keeps many persistent shells alive under unique names and
//! lets callers run commands in them concurrently. Each shell runs at most
//! one command at a time: a command is dispatched only after its name was
//! atomically inserted into the busy table, and the [`BusyGuard`] returned by
//! that insert removes it again however the command ends.
//!
//! Shells whose command timed out, or whose process died, are evicted and
//! must be recreated. Idle shells are swept periodically by
//! [`ShellManager::start_idle_cleanup`].

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use shellkit_async_utils::OrCancelExt;
use shellkit_process::CommandResult;
use shellkit_process::FailureKind;
use shellkit_process::is_valid_env_key;
use shellkit_utils_common::format_duration;
use shellkit_utils_common::format_elapsed;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::builder::PersistentShellBuilder;
use crate::config::ShellConfig;
use crate::error::Result;
use crate::error::ShellError;
use crate::flavor::ShellFlavor;
use crate::persistent::PersistentShell;
use crate::persistent::ShellCommand;
use crate::resource::NoopResourceMonitor;
use crate::resource::ResourceLimits;
use crate::resource::ResourceMonitor;
use crate::resource::ResourceUsage;

/// Poll period of [`ShellManager::wait_for_shell_availability`].
pub const AVAILABILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// The command currently occupying a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommandInfo {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub timeout: Duration,
    id: u64,
}

impl ShellCommandInfo {
    fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            started_at: Utc::now(),
            timeout,
            id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn running_for(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }
}

/// Clears a busy-table slot on drop, but only the slot it created.
struct BusyGuard {
    busy: Arc<DashMap<String, ShellCommandInfo>>,
    name: String,
    id: u64,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let id = self.id;
        self.busy.remove_if(&self.name, |_, info| info.id == id);
    }
}

#[derive(Debug)]
struct ShellEntry {
    shell: PersistentShell,
    created_at: DateTime<Utc>,
    last_activity: StdMutex<Instant>,
    idle_timeout: Duration,
    working_dir: Option<PathBuf>,
    auto_promoted: bool,
    last_result: StdMutex<Option<CommandResult>>,
}

impl ShellEntry {
    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn store_result(&self, result: &CommandResult) {
        *self
            .last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
    }
}

/// Public snapshot of a registered shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellInfo {
    pub name: String,
    pub flavor: ShellFlavor,
    pub shell_path: PathBuf,
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub idle_for: Duration,
    pub idle_timeout: Duration,
    pub working_dir: Option<PathBuf>,
    pub auto_promoted: bool,
    pub busy: bool,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
    Idle,
    Busy {
        command: String,
        running_for: Duration,
    },
    /// The process has exited; the shell will be evicted.
    Dead,
}

/// Result of [`ShellManager::run_command_or_promote`].
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    pub result: CommandResult,
    /// Name of the shell now running the command in the background, set when
    /// the one-shot run timed out.
    pub promoted_shell: Option<String>,
}

/// Registry of named persistent shells.
pub struct ShellManager {
    shells: DashMap<String, Arc<ShellEntry>>,
    busy: Arc<DashMap<String, ShellCommandInfo>>,
    monitor: Arc<dyn ResourceMonitor>,
    config: ShellConfig,
    cleanup_task: StdMutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ShellManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellManager")
            .field("shells", &self.shells.len())
            .field("busy", &self.busy.len())
            .field("monitor", &self.monitor)
            .finish()
    }
}

impl Default for ShellManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellManager {
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default(), Arc::new(NoopResourceMonitor))
    }

    pub fn with_config(config: ShellConfig, monitor: Arc<dyn ResourceMonitor>) -> Self {
        Self {
            shells: DashMap::new(),
            busy: Arc::new(DashMap::new()),
            monitor,
            config,
            cleanup_task: StdMutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Starts a shell, runs its setup commands and registers it.
    ///
    /// Without a `name` the shell is called `{flavor}-{n}` with the smallest
    /// free `n`.
    pub async fn create_shell(
        &self,
        flavor: ShellFlavor,
        name: Option<String>,
        working_dir: Option<PathBuf>,
        env: BTreeMap<String, String>,
    ) -> Result<String> {
        if let Some(name) = &name {
            if name.trim().is_empty() {
                return Err(ShellError::Config("shell name must not be empty".to_string()));
            }
            if self.shells.contains_key(name) {
                return Err(ShellError::AlreadyExists(name.clone()));
            }
        }
        let shell = self.spawn_shell(flavor, working_dir.as_deref(), &env).await?;
        let entry = Arc::new(ShellEntry {
            shell,
            created_at: Utc::now(),
            last_activity: StdMutex::new(Instant::now()),
            idle_timeout: self.config.manager.idle_timeout,
            working_dir,
            auto_promoted: false,
            last_result: StdMutex::new(None),
        });
        self.register(name, flavor, entry)
    }

    /// Creates a shell for a command that outgrew a one-shot run and re-runs
    /// the command in it in the background.
    ///
    /// The shell stays busy until the command finishes; its result is then
    /// available through [`ShellManager::last_result`].
    pub async fn create_auto_promoted_shell(
        self: &Arc<Self>,
        flavor: ShellFlavor,
        original_command: &str,
        working_dir: Option<PathBuf>,
    ) -> Result<String> {
        let shell = self
            .spawn_shell(flavor, working_dir.as_deref(), &BTreeMap::new())
            .await?;
        let timeout = self.config.manager.auto_promoted_idle_timeout;
        let entry = Arc::new(ShellEntry {
            shell,
            created_at: Utc::now(),
            last_activity: StdMutex::new(Instant::now()),
            idle_timeout: timeout,
            working_dir,
            auto_promoted: true,
            last_result: StdMutex::new(None),
        });
        let name = auto_promoted_name(flavor, Utc::now(), rand::random());
        // Marked busy before it becomes visible.
        let guard = match self.try_mark_busy(&name, ShellCommandInfo::new(original_command, timeout)) {
            Ok(guard) => guard,
            Err(blocking) => {
                entry.shell.force_shutdown();
                return Err(ShellError::Busy {
                    name,
                    command: blocking.command,
                });
            }
        };
        let name = self.register(Some(name), flavor, Arc::clone(&entry))?;
        let manager = Arc::downgrade(self);
        let command = ShellCommand::new(original_command).with_timeout(timeout);
        let task_name = name.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let result = run_guarded(&entry.shell, command).await;
            entry.touch();
            entry.store_result(&result);
            tracing::info!(
                name = %task_name,
                state = ?result.state,
                exit_code = result.exit_code,
                "Auto-promoted command finished"
            );
            if should_evict(&entry, &result)
                && let Some(manager) = manager.upgrade()
            {
                manager.evict(&task_name, &entry);
            }
        });
        tracing::info!(%name, "Auto-promoted command to a named shell");
        Ok(name)
    }

    /// Runs `command` in the named shell.
    ///
    /// A busy shell fails fast with a `Busy` result unless `wait_for_shell`
    /// gives a budget to wait for it. Shells whose command timed out or whose
    /// process died are removed afterwards.
    pub async fn execute_in_shell(
        &self,
        name: &str,
        command: &str,
        timeout: Option<Duration>,
        wait_for_shell: Option<Duration>,
    ) -> CommandResult {
        let started_at = Instant::now();
        if !self.shells.contains_key(name) {
            return not_found(name, started_at.elapsed());
        }

        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let info = ShellCommandInfo::new(command, timeout);
        let guard = match self.mark_busy_within(name, info, wait_for_shell).await {
            Ok(guard) => guard,
            Err(blocking) => {
                let err = ShellError::Busy {
                    name: name.to_string(),
                    command: blocking.command.clone(),
                };
                tracing::debug!("{err}");
                return CommandResult::error(
                    FailureKind::Busy,
                    format!("{err} (running for {})", format_duration(blocking.running_for())),
                    started_at.elapsed(),
                );
            }
        };

        let Some(entry) = self.shells.get(name).map(|entry| Arc::clone(entry.value())) else {
            return not_found(name, started_at.elapsed());
        };
        entry.touch();
        let result = run_guarded(&entry.shell, ShellCommand::new(command).with_timeout(timeout)).await;
        entry.touch();
        tracing::debug!(
            name,
            state = ?result.state,
            exit_code = result.exit_code,
            "Command finished in {}",
            format_elapsed(started_at)
        );
        if should_evict(&entry, &result) {
            tracing::warn!(name, state = ?result.state, "Removing shell after fatal command outcome");
            self.evict(name, &entry);
        }
        drop(guard);
        result
    }

    /// Waits until `name` exists and is not busy.
    pub async fn wait_for_shell_availability(&self, name: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.shells.contains_key(name) {
                return false;
            }
            if !self.busy.contains_key(name) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(AVAILABILITY_POLL_INTERVAL).await;
        }
    }

    pub fn rename_shell(&self, old: &str, new: &str) -> Result<()> {
        if new.trim().is_empty() {
            return Err(ShellError::Config("shell name must not be empty".to_string()));
        }
        if !self.shells.contains_key(old) {
            return Err(ShellError::NotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        let _guard = self
            .try_mark_busy(old, ShellCommandInfo::new("<rename>", Duration::ZERO))
            .map_err(|blocking| ShellError::Busy {
                name: old.to_string(),
                command: blocking.command,
            })?;
        if self.busy.contains_key(new) {
            return Err(ShellError::AlreadyExists(new.to_string()));
        }
        let Some((_, entry)) = self.shells.remove(old) else {
            return Err(ShellError::NotFound(old.to_string()));
        };
        let conflict = match self.shells.entry(new.to_string()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&entry));
                false
            }
        };
        if conflict {
            self.shells.insert(old.to_string(), entry);
            return Err(ShellError::AlreadyExists(new.to_string()));
        }

        self.monitor.unregister(old);
        if let Some(pid) = entry.shell.pid() {
            self.monitor.register(pid, new, entry.shell.flavor());
        }
        tracing::info!(old, new, "Renamed shell");
        Ok(())
    }

    /// Removes the shell and stops it. A non-forced termination lets the
    /// shell exit on its own first.
    pub async fn terminate_shell(&self, name: &str, force: bool) -> Result<()> {
        let Some((_, entry)) = self.shells.remove(name) else {
            return Err(ShellError::NotFound(name.to_string()));
        };
        self.busy.remove(name);
        self.monitor.unregister(name);
        if force {
            entry.shell.force_shutdown();
        } else {
            entry.shell.shutdown(true).await;
        }
        tracing::info!(name, force, "Terminated shell");
        Ok(())
    }

    /// All registered shells, sorted by name.
    pub fn list_shells(&self) -> Vec<ShellInfo> {
        let mut shells: Vec<ShellInfo> = self
            .shells
            .iter()
            .map(|entry| self.info_for(entry.key(), entry.value()))
            .collect();
        shells.sort_by(|a, b| a.name.cmp(&b.name));
        shells
    }

    pub fn shell_info(&self, name: &str) -> Option<ShellInfo> {
        self.shells
            .get(name)
            .map(|entry| self.info_for(name, entry.value()))
    }

    pub fn shell_state(&self, name: &str) -> Option<ShellState> {
        let entry = self.shells.get(name)?;
        if !entry.shell.is_alive() {
            return Some(ShellState::Dead);
        }
        Some(match self.busy.get(name) {
            Some(info) => ShellState::Busy {
                command: info.command.clone(),
                running_for: info.running_for(),
            },
            None => ShellState::Idle,
        })
    }

    /// The command currently running in `name`, if any.
    pub fn busy_command(&self, name: &str) -> Option<ShellCommandInfo> {
        self.busy.get(name).map(|info| info.clone())
    }

    /// Result of the last background command of an auto-promoted shell.
    pub fn last_result(&self, name: &str) -> Option<CommandResult> {
        let entry = self.shells.get(name)?;
        entry
            .last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn resource_usage(&self, name: &str) -> Option<ResourceUsage> {
        self.monitor.usage(name)
    }

    pub fn set_resource_limits(&self, name: &str, limits: ResourceLimits) -> bool {
        self.monitor.set_limits(name, limits)
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    /// Removes shells idle past their timeout and shells whose process has
    /// died. Busy shells are never touched. Returns the removed names.
    pub fn cleanup_idle_shells(&self) -> Vec<String> {
        let candidates: Vec<(String, Arc<ShellEntry>)> = self
            .shells
            .iter()
            .filter(|entry| {
                !entry.shell.is_alive() || entry.idle_for() >= entry.idle_timeout
            })
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut removed = Vec::new();
        for (name, entry) in candidates {
            let Ok(_guard) =
                self.try_mark_busy(&name, ShellCommandInfo::new("<idle cleanup>", Duration::ZERO))
            else {
                continue;
            };
            if self.evict(&name, &entry) {
                tracing::info!(%name, idle_for = ?entry.idle_for(), "Removed idle shell");
                removed.push(name);
            }
        }
        removed
    }

    /// Spawns the periodic idle sweep. The task holds only a weak reference
    /// and stops when the manager is dropped. Calling this again while the
    /// task runs has no effect.
    pub fn start_idle_cleanup(self: &Arc<Self>) {
        let mut slot = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let manager = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let period = self.config.manager.cleanup_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                if ticker.tick().or_cancel(&cancel).await.is_err() {
                    break;
                }
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let removed = manager.cleanup_idle_shells();
                if !removed.is_empty() {
                    tracing::debug!(count = removed.len(), "Idle sweep removed shells");
                }
            }
        }));
    }

    /// One-shot execution that turns into a background named shell when the
    /// command times out.
    pub async fn run_command_or_promote(
        self: &Arc<Self>,
        flavor: ShellFlavor,
        command: &str,
        timeout: Duration,
        working_dir: Option<PathBuf>,
    ) -> Result<PromotionOutcome> {
        let mut builder = PersistentShellBuilder::from_config(&self.config).flavor(flavor);
        if let Some(dir) = &working_dir {
            builder = builder.current_dir(dir);
        }
        let result = builder
            .run_with(ShellCommand::new(command).with_timeout(timeout))
            .await?;
        if !result.is_timed_out() {
            return Ok(PromotionOutcome {
                result,
                promoted_shell: None,
            });
        }
        let name = self
            .create_auto_promoted_shell(flavor, command, working_dir)
            .await?;
        Ok(PromotionOutcome {
            result,
            promoted_shell: Some(name),
        })
    }

    /// Kills every shell and stops the idle sweep.
    pub fn shutdown_all(&self) {
        self.cancel.cancel();
        if let Some(task) = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        let names: Vec<String> = self.shells.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            if let Some((_, entry)) = self.shells.remove(&name) {
                self.monitor.unregister(&name);
                entry.shell.force_shutdown();
            }
        }
        self.busy.clear();
    }

    async fn spawn_shell(
        &self,
        flavor: ShellFlavor,
        working_dir: Option<&Path>,
        env: &BTreeMap<String, String>,
    ) -> Result<PersistentShell> {
        if let Some(dir) = working_dir
            && !dir.is_dir()
        {
            return Err(ShellError::InvalidWorkingDirectory(dir.to_path_buf()));
        }
        if let Some(key) = env.keys().find(|key| !is_valid_env_key(key)) {
            return Err(ShellError::InvalidEnvKey(key.clone()));
        }

        let shell = PersistentShellBuilder::from_config(&self.config)
            .flavor(flavor)
            .build()?;
        shell.ensure_ready().await?;

        let setup = working_dir
            .map(|dir| flavor.cd_command(dir))
            .into_iter()
            .chain(env.iter().map(|(key, value)| flavor.set_env_command(key, value)));
        for command in setup {
            let result = shell.execute(&command).await;
            if !result.success() {
                shell.force_shutdown();
                let reason = result
                    .failure_message()
                    .unwrap_or_else(|| result.merged.trim().to_string());
                return Err(ShellError::SetupFailed(format!(
                    "`{command}` exited with code {}: {reason}",
                    result.exit_code
                )));
            }
        }
        Ok(shell)
    }

    fn register(
        &self,
        name: Option<String>,
        flavor: ShellFlavor,
        entry: Arc<ShellEntry>,
    ) -> Result<String> {
        let name = match name {
            Some(name) => {
                let inserted = match self.shells.entry(name.clone()) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(vacant) => {
                        vacant.insert(Arc::clone(&entry));
                        true
                    }
                };
                if !inserted {
                    entry.shell.force_shutdown();
                    return Err(ShellError::AlreadyExists(name));
                }
                name
            }
            None => loop {
                let candidate = next_shell_name(flavor, |name| self.shells.contains_key(name));
                if let Entry::Vacant(vacant) = self.shells.entry(candidate.clone()) {
                    vacant.insert(Arc::clone(&entry));
                    break candidate;
                }
            },
        };
        if let Some(pid) = entry.shell.pid() {
            self.monitor.register(pid, &name, flavor);
        }
        tracing::info!(%name, %flavor, pid = ?entry.shell.pid(), "Created shell");
        Ok(name)
    }

    fn info_for(&self, name: &str, entry: &ShellEntry) -> ShellInfo {
        ShellInfo {
            name: name.to_string(),
            flavor: entry.shell.flavor(),
            shell_path: entry.shell.shell().shell_path.clone(),
            pid: entry.shell.pid(),
            created_at: entry.created_at,
            idle_for: entry.idle_for(),
            idle_timeout: entry.idle_timeout,
            working_dir: entry.working_dir.clone(),
            auto_promoted: entry.auto_promoted,
            busy: self.busy.contains_key(name),
            alive: entry.shell.is_alive(),
        }
    }

    fn try_mark_busy(
        &self,
        name: &str,
        info: ShellCommandInfo,
    ) -> std::result::Result<BusyGuard, ShellCommandInfo> {
        let id = info.id;
        match self.busy.entry(name.to_string()) {
            Entry::Occupied(occupied) => Err(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(info);
                Ok(BusyGuard {
                    busy: Arc::clone(&self.busy),
                    name: name.to_string(),
                    id,
                })
            }
        }
    }

    async fn mark_busy_within(
        &self,
        name: &str,
        info: ShellCommandInfo,
        budget: Option<Duration>,
    ) -> std::result::Result<BusyGuard, ShellCommandInfo> {
        let deadline = Instant::now() + budget.unwrap_or_default();
        loop {
            match self.try_mark_busy(name, info.clone()) {
                Ok(guard) => return Ok(guard),
                Err(blocking) if budget.is_none() || Instant::now() >= deadline => {
                    return Err(blocking);
                }
                Err(_) => tokio::time::sleep(AVAILABILITY_POLL_INTERVAL).await,
            }
        }
    }

    /// Removes `entry` if it is still registered under `name` and kills it.
    fn evict(&self, name: &str, entry: &Arc<ShellEntry>) -> bool {
        let removed = self
            .shells
            .remove_if(name, |_, current| Arc::ptr_eq(current, entry))
            .is_some();
        if removed {
            self.monitor.unregister(name);
        }
        entry.shell.force_shutdown();
        removed
    }
}

impl Drop for ShellManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// `{flavor}-{n}` for the smallest `n >= 1` not taken.
pub(crate) fn next_shell_name(flavor: ShellFlavor, is_taken: impl Fn(&str) -> bool) -> String {
    (1u64..)
        .map(|n| format!("{flavor}-{n}"))
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| format!("{flavor}-{}", uuid::Uuid::new_v4().simple()))
}

/// `{flavor}-auto-{yyyyMMddHHmmss}-{4 hex digits}`.
pub(crate) fn auto_promoted_name(flavor: ShellFlavor, now: DateTime<Utc>, suffix: u16) -> String {
    format!("{flavor}-auto-{}-{suffix:04x}", now.format("%Y%m%d%H%M%S"))
}

fn should_evict(entry: &ShellEntry, result: &CommandResult) -> bool {
    result.is_timed_out()
        || !entry.shell.is_alive()
        || matches!(
            result.failure,
            Some(FailureKind::ShellExited | FailureKind::VerificationFailed)
        )
}

fn not_found(name: &str, elapsed: Duration) -> CommandResult {
    CommandResult::error(
        FailureKind::NotFound,
        ShellError::NotFound(name.to_string()).to_string(),
        elapsed,
    )
}

/// Runs a command, converting a panic into an `Error` result.
async fn run_guarded(shell: &PersistentShell, command: ShellCommand) -> CommandResult {
    let started_at = Instant::now();
    match AssertUnwindSafe(shell.execute_with(command))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Shell command panicked: {message}");
            CommandResult::error(
                FailureKind::Internal,
                format!("command execution panicked: {message}"),
                started_at.elapsed(),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[path = "registry.test.rs"]
mod tests;
