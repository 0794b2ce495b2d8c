//! Tracing subscriber setup shared by shellkit binaries.
//!
//! The library crates only emit `tracing` events; whoever hosts them decides
//! where those go. [`init_logging`] is the default wiring used by the CLI.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Logging configuration for the tracing subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Show file name and line number in log output
    pub location: bool,

    /// Show module path (target) in log output
    pub target: bool,

    /// Timezone for log timestamps
    pub timezone: TimezoneConfig,

    /// Default log level (trace, debug, info, warn, error)
    pub level: String,

    /// Module-specific log levels (e.g., "shellkit_shell=debug")
    #[serde(default)]
    pub modules: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            location: false,
            target: false,
            timezone: TimezoneConfig::Local,
            level: "info".to_string(),
            modules: vec![],
        }
    }
}

/// Timezone configuration for log timestamps
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimezoneConfig {
    /// Use local timezone
    #[default]
    Local,
    /// Use UTC timezone
    Utc,
}

/// A timer that formats timestamps in either local time or UTC.
///
/// A single type with runtime configuration keeps the subscriber type the
/// same in both cases.
#[derive(Debug, Clone)]
pub struct ConfigurableTimer {
    timezone: TimezoneConfig,
}

impl ConfigurableTimer {
    pub fn new(timezone: TimezoneConfig) -> Self {
        Self { timezone }
    }
}

impl FormatTime for ConfigurableTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match self.timezone {
            TimezoneConfig::Local => {
                let now = chrono::Local::now();
                write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f"))
            }
            TimezoneConfig::Utc => {
                let now = chrono::Utc::now();
                write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3fZ"))
            }
        }
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG` if set, otherwise from the config.
///
/// An empty `level` in the config falls back to `default_level`. Directives
/// in `modules` that fail to parse are skipped with a warning on stderr,
/// since the subscriber is not installed yet.
pub fn build_env_filter(logging: &LoggingConfig, default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if logging.level.trim().is_empty() {
        default_level
    } else {
        logging.level.trim()
    };

    let mut filter = EnvFilter::new(level);
    for module in &logging.modules {
        match module.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(err) => eprintln!("ignoring invalid log directive {module:?}: {err}"),
        }
    }
    filter
}

/// Installs a stderr `fmt` subscriber configured from `logging`.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = build_env_filter(logging, "info");
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ConfigurableTimer::new(logging.timezone))
        .with_file(logging.location)
        .with_line_number(logging.location)
        .with_target(logging.target)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
#[path = "logging.test.rs"]
mod tests;
