//! Timeout strategies for process and shell waits.

use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

/// Upper bound on how far a progressive deadline may stretch, as a multiple
/// of the configured timeout.
pub const PROGRESSIVE_CAP_FACTOR: u32 = 4;

/// How a timeout budget is turned into a deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutStrategy {
    /// Deadline is `start + timeout`, regardless of output.
    Fixed,
    /// The deadline moves to `last_output + timeout` whenever the process
    /// produces output, but never past `start + timeout * PROGRESSIVE_CAP_FACTOR`.
    #[default]
    Progressive,
}

impl TimeoutStrategy {
    pub fn deadline(
        self,
        started_at: Instant,
        last_output_at: Option<Instant>,
        timeout: Duration,
    ) -> Instant {
        let fixed = started_at + timeout;
        match self {
            TimeoutStrategy::Fixed => fixed,
            TimeoutStrategy::Progressive => {
                let cap = started_at + timeout.saturating_mul(PROGRESSIVE_CAP_FACTOR);
                match last_output_at {
                    Some(last) if last > started_at => (last + timeout).clamp(fixed, cap),
                    _ => fixed,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "timeout.test.rs"]
mod tests;
