//! Common utilities shared across the shellkit crates.

pub mod elapsed;
pub mod logging;

pub use elapsed::{format_duration, format_elapsed, format_millis};
pub use logging::{ConfigurableTimer, LoggingConfig, TimezoneConfig, build_env_filter, init_logging};
