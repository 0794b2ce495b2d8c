//! Observer hooks for process output and lifecycle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Called with one line of output, without its line terminator.
pub type LineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Called for every lifecycle transition.
pub type EventCallback = Arc<dyn Fn(&ProcessEvent) + Send + Sync>;

/// Lifecycle notifications emitted by a [`crate::ProcessHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started { pid: u32 },
    TimedOut { elapsed: Duration },
    Exited { exit_code: i32 },
}

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Optional callbacks invoked from the process reader and waiter tasks.
///
/// Callbacks run synchronously on those tasks, so they should return quickly.
#[derive(Clone, Default)]
pub struct ProcessCallbacks {
    on_stdout: Option<LineCallback>,
    on_stderr: Option<LineCallback>,
    on_output: Option<LineCallback>,
    on_event: Option<EventCallback>,
}

impl ProcessCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_stdout(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_stdout = Some(Arc::new(f));
        self
    }

    pub fn on_stderr(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_stderr = Some(Arc::new(f));
        self
    }

    /// Receives lines from both streams in arrival order.
    pub fn on_output(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_output = Some(Arc::new(f));
        self
    }

    pub fn on_event(mut self, f: impl Fn(&ProcessEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_line(&self, stream: OutputStream, line: &str) {
        let per_stream = match stream {
            OutputStream::Stdout => &self.on_stdout,
            OutputStream::Stderr => &self.on_stderr,
        };
        if let Some(cb) = per_stream {
            cb(line);
        }
        if let Some(cb) = &self.on_output {
            cb(line);
        }
    }

    pub(crate) fn emit_event(&self, event: &ProcessEvent) {
        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}

impl fmt::Debug for ProcessCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCallbacks")
            .field("on_stdout", &self.on_stdout.is_some())
            .field("on_stderr", &self.on_stderr.is_some())
            .field("on_output", &self.on_output.is_some())
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}
