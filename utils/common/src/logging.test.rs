use super::*;
use pretty_assertions::assert_eq;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

#[test]
fn test_configurable_timer_local() {
    let timer = ConfigurableTimer::new(TimezoneConfig::Local);
    let mut buf = String::new();
    let mut writer = Writer::new(&mut buf);
    timer.format_time(&mut writer).expect("format local time");
    assert!(!buf.ends_with('Z'));
    assert_eq!(buf.len(), "2026-01-01 00:00:00.000".len());
}

#[test]
fn test_configurable_timer_utc() {
    let timer = ConfigurableTimer::new(TimezoneConfig::Utc);
    let mut buf = String::new();
    let mut writer = Writer::new(&mut buf);
    timer.format_time(&mut writer).expect("format utc time");
    assert!(buf.ends_with('Z'));
}

#[test]
fn test_build_env_filter_with_default() {
    let logging = LoggingConfig::default();
    let filter = build_env_filter(&logging, "error");
    let _ = format!("{filter:?}");
}

#[test]
fn test_build_env_filter_with_modules() {
    let logging = LoggingConfig {
        location: false,
        target: false,
        timezone: TimezoneConfig::Local,
        level: "info".to_string(),
        modules: vec![
            "shellkit_shell=debug".to_string(),
            "shellkit_process=trace".to_string(),
        ],
    };
    let filter = build_env_filter(&logging, "error");
    let filter_str = format!("{filter:?}");
    assert!(filter_str.contains("shellkit_shell") || filter_str.contains("debug"));
}

#[test]
fn test_build_env_filter_skips_invalid_directive() {
    let logging = LoggingConfig {
        modules: vec!["shellkit_shell=notalevel".to_string()],
        ..LoggingConfig::default()
    };
    let _ = build_env_filter(&logging, "warn");
}

#[test]
fn test_logging_config_from_toml() {
    let parsed: LoggingConfig = toml::from_str(
        r#"
level = "debug"
timezone = "utc"
modules = ["shellkit_shell=trace"]
"#,
    )
    .expect("parse logging config");

    assert_eq!(parsed.level, "debug");
    assert_eq!(parsed.timezone, TimezoneConfig::Utc);
    assert_eq!(parsed.modules, vec!["shellkit_shell=trace".to_string()]);
    assert!(!parsed.location);
}
