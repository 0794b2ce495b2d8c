//! TOML configuration for shells and the shell registry.
//!
//! ```toml
//! default_timeout = "30s"
//! poll_interval = "50ms"
//! timeout_strategy = "progressive"
//! default_flavor = "bash"
//!
//! [manager]
//! idle_timeout = "2h"
//! cleanup_interval = "15m"
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use shellkit_process::TimeoutStrategy;
use shellkit_utils_common::LoggingConfig;

use crate::error::Result;
use crate::error::ShellError;
use crate::flavor::ShellFlavor;

/// Directory under the home directory holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = ".shellkit";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_VERBOSE: &str = "SHELLKIT_VERBOSE";
pub const ENV_DEFAULT_TIMEOUT: &str = "SHELLKIT_DEFAULT_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub verification_timeout: Duration,
    pub timeout_strategy: TimeoutStrategy,
    /// Echo subprocess output to the log.
    pub verbose: bool,
    /// Flavor used when none is requested; the platform default otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flavor: Option<ShellFlavor>,
    pub manager: ManagerConfig,
    pub logging: LoggingConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
            verification_timeout: Duration::from_secs(10),
            timeout_strategy: TimeoutStrategy::default(),
            verbose: false,
            default_flavor: None,
            manager: ManagerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Registry housekeeping settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Idle time after which a named shell is evicted.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub auto_promoted_idle_timeout: Duration,
    /// Period of the background idle sweep.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(2 * 60 * 60),
            auto_promoted_idle_timeout: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(15 * 60),
        }
    }
}

impl ShellConfig {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_toml_str(&text)?;
                tracing::debug!(path = %path.display(), "Loaded shell config");
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ShellError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SHELLKIT_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup, so tests need not touch
    /// the real environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_VERBOSE) {
            self.verbose = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(value) = lookup(ENV_DEFAULT_TIMEOUT) {
            self.default_timeout = humantime_serde::re::humantime::parse_duration(value.trim())
                .map_err(|err| {
                    ShellError::Config(format!("{ENV_DEFAULT_TIMEOUT}={value:?}: {err}"))
                })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("default_timeout", self.default_timeout),
            ("poll_interval", self.poll_interval),
            ("verification_timeout", self.verification_timeout),
            ("manager.cleanup_interval", self.manager.cleanup_interval),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| value.is_zero()) {
            return Err(ShellError::Config(format!("{name} must be positive")));
        }
        Ok(())
    }
}

/// `~/.shellkit/config.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
