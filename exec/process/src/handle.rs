//! Supervised native process.
//!
//! A [`ProcessHandle`] owns exactly one OS process. Output is captured by one
//! reader task per pipe and the child itself lives in a waiter task that
//! publishes the exit code through a watch channel, so every query on the
//! handle is a snapshot and never blocks on the process.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::callbacks::OutputStream;
use crate::callbacks::ProcessCallbacks;
use crate::callbacks::ProcessEvent;
use crate::error::ProcessError;
use crate::error::Result;
use crate::output::Decoded;
use crate::output::LineDecoder;
use crate::output::OutputBuffers;
use crate::result::CapturedOutput;
use crate::result::CommandResult;
use crate::result::FailureKind;
use crate::timeout::TimeoutStrategy;
use crate::verbosity::ConsoleVerbosity;

/// Size of a single pipe read.
const READ_CHUNK_BYTES: usize = 4096;

/// How long the waiter lets readers drain after the process exits. Orphaned
/// grandchildren can keep a pipe open indefinitely.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How long to wait for a killed process to be reaped.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Log target used when echoing subprocess output in verbose mode.
pub const OUTPUT_LOG_TARGET: &str = "shellkit::output";

/// Everything needed to spawn a process. Assembled by [`crate::ProcessBuilder`].
#[derive(Debug, Clone)]
pub(crate) struct ProcessSpec {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) current_dir: Option<PathBuf>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) stdin: Option<String>,
    pub(crate) keep_stdin_open: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) timeout_strategy: TimeoutStrategy,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) callbacks: ProcessCallbacks,
    pub(crate) verbosity: Option<Arc<dyn ConsoleVerbosity>>,
}

/// Observable lifecycle of a [`ProcessHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Created,
    Running,
    Exited(i32),
}

enum WaitOutcome {
    Exited(i32),
    TimedOut,
    Canceled,
}

/// Handle to a single supervised OS process.
///
/// Dropping a started handle kills the process.
#[derive(Debug)]
pub struct ProcessHandle {
    spec: ProcessSpec,
    started: AtomicBool,
    shutdown: AtomicBool,
    pid: AtomicU32,
    buffers: Arc<OutputBuffers>,
    stdin: Mutex<Option<ChildStdin>>,
    kill: CancellationToken,
    exit_tx: Arc<watch::Sender<Option<i32>>>,
}

impl ProcessHandle {
    pub(crate) fn new(spec: ProcessSpec) -> Self {
        let (exit_tx, _) = watch::channel(None);
        Self {
            spec,
            started: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            pid: AtomicU32::new(0),
            buffers: Arc::new(OutputBuffers::default()),
            stdin: Mutex::new(None),
            kill: CancellationToken::new(),
            exit_tx: Arc::new(exit_tx),
        }
    }

    pub fn program(&self) -> &str {
        &self.spec.program
    }

    pub fn args(&self) -> &[String] {
        &self.spec.args
    }

    /// Configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.spec.timeout
    }

    pub fn timeout_strategy(&self) -> TimeoutStrategy {
        self.spec.timeout_strategy
    }

    /// Spawns the process and returns its pid.
    ///
    /// Only one call can succeed. A failed spawn leaves the handle in the
    /// `Created` state.
    pub async fn start(&self) -> Result<u32> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(ProcessError::ShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ProcessError::AlreadyStarted);
        }

        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(source) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(ProcessError::StartFailure {
                    program: self.spec.program.clone(),
                    source,
                });
            }
        };

        let pid = child.id().unwrap_or(0);
        self.pid.store(pid, Ordering::SeqCst);
        tracing::debug!(pid, program = %self.spec.program, "Process started");
        self.spec
            .callbacks
            .emit_event(&ProcessEvent::Started { pid });

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(self.spawn_reader(stdout, OutputStream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(self.spawn_reader(stderr, OutputStream::Stderr));
        }

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(payload) = &self.spec.stdin
                && let Err(err) = write_and_flush(&mut stdin, payload).await
            {
                tracing::warn!("Failed to write stdin payload to pid {pid}: {err}");
            }
            if self.spec.keep_stdin_open {
                *self.stdin.lock().await = Some(stdin);
            }
        }

        let kill = self.kill.clone();
        let exit_tx = Arc::clone(&self.exit_tx);
        let callbacks = self.spec.callbacks.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill.cancelled() => {
                    if let Err(err) = child.start_kill() {
                        tracing::debug!("Failed to kill pid {pid}: {err}");
                    }
                    child.wait().await
                }
            };
            let exit_code = match status {
                Ok(status) => exit_code_of(status),
                Err(err) => {
                    tracing::warn!("Failed to wait for pid {pid}: {err}");
                    -1
                }
            };
            for mut reader in readers {
                if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader)
                    .await
                    .is_err()
                {
                    reader.abort();
                }
            }
            tracing::debug!(pid, exit_code, "Process exited");
            callbacks.emit_event(&ProcessEvent::Exited { exit_code });
            exit_tx.send_replace(Some(exit_code));
        });

        Ok(pid)
    }

    /// Writes `text` to the process's standard input and flushes it.
    pub async fn send_input(&self, text: &str) -> Result<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(ProcessError::StdinClosed)?;
        write_and_flush(stdin, text).await?;
        Ok(())
    }

    /// Closes standard input so the process sees EOF.
    pub async fn close_stdin(&self) {
        self.stdin.lock().await.take();
    }

    pub fn current_output(&self) -> String {
        self.buffers.stdout()
    }

    pub fn current_error(&self) -> String {
        self.buffers.stderr()
    }

    pub fn current_merged_output(&self) -> String {
        self.buffers.merged()
    }

    /// All three buffers taken under one lock.
    pub fn snapshot(&self) -> CapturedOutput {
        self.buffers.snapshot()
    }

    /// Empties the output buffers. The process is not touched.
    pub fn clear_outputs(&self) {
        self.buffers.clear();
    }

    /// Drains the output buffers, returning what they held. Output that
    /// arrives afterwards lands in the emptied buffers.
    pub fn take_outputs(&self) -> CapturedOutput {
        self.buffers.take_snapshot()
    }

    /// When the process last wrote to either pipe.
    pub fn last_output_at(&self) -> Option<Instant> {
        self.buffers.last_output_at()
    }

    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_tx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_code().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.has_exited()
    }

    pub fn state(&self) -> ProcessState {
        match self.exit_code() {
            Some(code) => ProcessState::Exited(code),
            None if self.started.load(Ordering::SeqCst) => ProcessState::Running,
            None => ProcessState::Created,
        }
    }

    /// Kills the process and its process group. Safe to call repeatedly;
    /// only the first call has an effect.
    pub fn force_shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.is_running() {
            #[cfg(unix)]
            if let Some(pid) = self.pid() {
                kill_process_group(pid);
            }
            tracing::debug!(pid = ?self.pid(), program = %self.spec.program, "Force shutdown");
        }
        self.kill.cancel();
    }

    /// Waits for the process to exit and returns its exit code.
    pub async fn wait_for_exit(&self) -> Result<i32> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(ProcessError::NotStarted);
        }
        let mut rx = self.exit_tx.subscribe();
        let code = rx
            .wait_for(Option::is_some)
            .await
            .map(|code| (*code).unwrap_or(-1))
            .unwrap_or(-1);
        Ok(code)
    }

    /// Like [`ProcessHandle::wait_for_exit`] but gives up after `limit`.
    pub async fn wait_for_exit_timeout(&self, limit: Duration) -> Option<i32> {
        match tokio::time::timeout(limit, self.wait_for_exit()).await {
            Ok(Ok(code)) => Some(code),
            _ => None,
        }
    }

    /// Starts the process and waits for it, bounded by the configured timeout
    /// and cancellation token.
    ///
    /// On timeout the process is killed and the result keeps whatever output
    /// had been captured.
    pub async fn run(&self) -> CommandResult {
        let started_at = Instant::now();
        if let Err(err) = self.start().await {
            tracing::warn!("{err}");
            return CommandResult::error(
                FailureKind::StartFailure,
                err.to_string(),
                started_at.elapsed(),
            );
        }

        match self.wait_bounded(started_at).await {
            WaitOutcome::Exited(code) => {
                CommandResult::completed(self.snapshot(), code, started_at.elapsed())
            }
            WaitOutcome::TimedOut => {
                let elapsed = started_at.elapsed();
                tracing::info!(
                    program = %self.spec.program,
                    "Process timed out after {}ms",
                    elapsed.as_millis()
                );
                self.spec
                    .callbacks
                    .emit_event(&ProcessEvent::TimedOut { elapsed });
                self.force_shutdown();
                let _ = self.wait_for_exit_timeout(KILL_GRACE).await;
                CommandResult::timed_out(self.snapshot(), elapsed)
            }
            WaitOutcome::Canceled => {
                let elapsed = started_at.elapsed();
                self.force_shutdown();
                let _ = self.wait_for_exit_timeout(KILL_GRACE).await;
                CommandResult::canceled(self.snapshot(), elapsed)
            }
        }
    }

    async fn wait_bounded(&self, started_at: Instant) -> WaitOutcome {
        let mut rx = self.exit_tx.subscribe();
        let cancel = self.spec.cancellation.clone().unwrap_or_default();
        loop {
            let exited = *rx.borrow_and_update();
            if let Some(code) = exited {
                return WaitOutcome::Exited(code);
            }

            let deadline = self.spec.timeout.map(|timeout| {
                self.spec
                    .timeout_strategy
                    .deadline(started_at, self.buffers.last_output_at(), timeout)
            });
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return WaitOutcome::TimedOut;
            }

            let sleep = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return WaitOutcome::Exited(-1);
                    }
                }
                _ = sleep => {}
                _ = cancel.cancelled() => return WaitOutcome::Canceled,
            }
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.spec.program);
        command
            .args(&self.spec.args)
            .envs(&self.spec.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.spec.stdin.is_some() || self.spec.keep_stdin_open {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }
        if let Some(dir) = &self.spec.current_dir {
            command.current_dir(dir);
        }
        // Own process group so a kill reaches the children of a shell too.
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    fn spawn_reader<R>(&self, mut reader: R, stream: OutputStream) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffers = Arc::clone(&self.buffers);
        let callbacks = self.spec.callbacks.clone();
        let verbosity = self.spec.verbosity.clone();
        tokio::spawn(async move {
            let mut decoder = LineDecoder::default();
            let mut chunk = vec![0u8; READ_CHUNK_BYTES];
            loop {
                let decoded = match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => decoder.push(&chunk[..n]),
                    Err(err) => {
                        tracing::debug!("Failed to read {stream}: {err}");
                        break;
                    }
                };
                publish(&buffers, &callbacks, verbosity.as_deref(), stream, decoded);
            }
            let decoded = decoder.finish();
            publish(&buffers, &callbacks, verbosity.as_deref(), stream, decoded);
        })
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.is_running() {
            self.force_shutdown();
        }
    }
}

fn publish(
    buffers: &OutputBuffers,
    callbacks: &ProcessCallbacks,
    verbosity: Option<&dyn ConsoleVerbosity>,
    stream: OutputStream,
    decoded: Decoded,
) {
    buffers.append(stream, &decoded.text);
    let verbose = verbosity.is_some_and(ConsoleVerbosity::is_verbose);
    for line in &decoded.lines {
        if verbose {
            tracing::info!(target: OUTPUT_LOG_TARGET, %stream, "{line}");
        }
        callbacks.emit_line(stream, line);
    }
}

async fn write_and_flush(stdin: &mut ChildStdin, text: &str) -> std::io::Result<()> {
    stdin.write_all(text.as_bytes()).await?;
    stdin.flush().await
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only delivers a signal. The group was created for this
    // child via `process_group(0)` and the child has not been reaped yet.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            "killpg({pgid}) failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(test)]
#[path = "handle.test.rs"]
mod tests;
