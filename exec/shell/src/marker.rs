//! Completion-marker parsing.
//!
//! Each persistent shell owns a random marker. After every command the shell
//! prints `<marker><exit status>` on its own line; finding that line is the
//! only reliable signal that the command finished.

use std::time::Duration;

use regex::Regex;

/// Cancellations this close to the command timeout are treated as timeouts.
pub const TIMEOUT_CLASSIFICATION_WINDOW: Duration = Duration::from_millis(100);

/// Why a wait for the marker was abandoned early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    TimedOut,
    Canceled,
}

/// Decides whether a cancellation observed after `elapsed` was really the
/// command's `timeout` expiring.
///
/// This is a heuristic: a caller that cancels independently at almost the
/// same moment as the deadline is indistinguishable from a timeout.
pub fn classify_abort(elapsed: Duration, timeout: Duration) -> AbortKind {
    if elapsed.abs_diff(timeout) <= TIMEOUT_CLASSIFICATION_WINDOW {
        AbortKind::TimedOut
    } else {
        AbortKind::Canceled
    }
}

/// Generates a fresh, collision-resistant marker.
pub fn new_marker() -> String {
    format!("__SHELLKIT_MARK_{}__", uuid::Uuid::new_v4().simple())
}

/// Location of a command's completion marker in captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Completion {
    /// `None` when the digits after the marker do not fit an `i32`.
    pub(crate) exit_code: Option<i32>,
    /// Byte offset where this command's output begins, past any stale
    /// markers from earlier abandoned commands.
    pub(crate) output_start: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct MarkerProtocol {
    marker: String,
    find_re: Regex,
    strip_re: Regex,
}

impl MarkerProtocol {
    pub(crate) fn new(marker: String) -> Result<Self, regex::Error> {
        let escaped = regex::escape(&marker);
        let find_re = Regex::new(&format!(r"{escaped}(-?\d+)"))?;
        let strip_re = Regex::new(&format!(r"\r?\n?{escaped}-?\d+[ \t]*\r?\n?"))?;
        Ok(Self {
            marker,
            find_re,
            strip_re,
        })
    }

    pub(crate) fn marker(&self) -> &str {
        &self.marker
    }

    /// Number of markers present in `text`.
    pub(crate) fn count(&self, text: &str) -> usize {
        self.find_re.find_iter(text).count()
    }

    /// Offset just past the `stale` markers left by earlier commands, or
    /// `None` while some of them have not been printed yet.
    pub(crate) fn output_start(&self, text: &str, stale: usize) -> Option<usize> {
        let mut start = 0;
        let mut seen = 0;
        for found in self.find_re.find_iter(text).take(stale) {
            start = line_end(text, found.end());
            seen += 1;
        }
        (seen == stale).then_some(start)
    }

    /// Finds this command's marker, skipping the first `stale` markers that
    /// belong to earlier commands.
    pub(crate) fn find_completion(&self, text: &str, stale: usize) -> Option<Completion> {
        let output_start = self.output_start(text, stale)?;
        let captures = self.find_re.captures(text.get(output_start..)?)?;
        let exit_code = captures.get(1).and_then(|m| m.as_str().parse().ok());
        Some(Completion {
            exit_code,
            output_start,
        })
    }

    /// Output from `start` on with every marker line removed, including the
    /// blank separator line the epilogue prints before the marker.
    pub(crate) fn strip(&self, text: &str, start: usize) -> String {
        let text = text.get(start..).unwrap_or_default();
        let stripped = self.strip_re.replace_all(text, "");
        if stripped.contains(&self.marker) {
            stripped
                .split_inclusive('\n')
                .filter(|line| !line.contains(&self.marker))
                .collect()
        } else {
            stripped.into_owned()
        }
    }
}

/// Offset just past the line containing `pos`.
fn line_end(text: &str, pos: usize) -> usize {
    text.get(pos..)
        .and_then(|rest| rest.find('\n'))
        .map_or(text.len(), |idx| pos + idx + 1)
}

#[cfg(test)]
#[path = "marker.test.rs"]
mod tests;
