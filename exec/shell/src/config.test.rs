use super::*;
use pretty_assertions::assert_eq;
use shellkit_utils_common::TimezoneConfig;
use std::collections::HashMap;

#[test]
fn test_defaults() {
    let config = ShellConfig::default();
    assert_eq!(config.default_timeout, Duration::from_secs(30));
    assert_eq!(config.poll_interval, Duration::from_millis(50));
    assert_eq!(config.verification_timeout, Duration::from_secs(10));
    assert_eq!(config.manager.idle_timeout, Duration::from_secs(7200));
    assert_eq!(config.manager.auto_promoted_idle_timeout, Duration::from_secs(1800));
    assert_eq!(config.manager.cleanup_interval, Duration::from_secs(900));
    assert!(!config.verbose);
}

#[test]
fn test_parse_full_file() {
    let config = ShellConfig::from_toml_str(
        r#"
default_timeout = "2m"
poll_interval = "20ms"
timeout_strategy = "fixed"
verbose = true
default_flavor = "pwsh"

[manager]
idle_timeout = "1h"
cleanup_interval = "30s"

[logging]
level = "debug"
timezone = "utc"
"#,
    )
    .expect("parse");
    assert_eq!(config.default_timeout, Duration::from_secs(120));
    assert_eq!(config.poll_interval, Duration::from_millis(20));
    assert_eq!(config.timeout_strategy, TimeoutStrategy::Fixed);
    assert!(config.verbose);
    assert_eq!(config.default_flavor, Some(ShellFlavor::PowerShell));
    assert_eq!(config.manager.idle_timeout, Duration::from_secs(3600));
    assert_eq!(config.manager.auto_promoted_idle_timeout, Duration::from_secs(1800));
    assert_eq!(config.manager.cleanup_interval, Duration::from_secs(30));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.timezone, TimezoneConfig::Utc);
}

#[test]
fn test_empty_file_is_default() {
    assert_eq!(ShellConfig::from_toml_str("").expect("parse"), ShellConfig::default());
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = ShellConfig::from_toml_str("default_timeout = \"soon\"").expect_err("bad duration");
    assert!(matches!(err, ShellError::ConfigParse(_)));

    let err = ShellConfig::from_toml_str("poll_interval = \"0s\"").expect_err("zero");
    assert!(err.to_string().contains("poll_interval"));
}

#[test]
fn test_load_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ShellConfig::load(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(config, ShellConfig::default());
}

#[test]
fn test_load_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "default_timeout = \"45s\"\n").expect("write");
    let config = ShellConfig::load(&path).expect("load");
    assert_eq!(config.default_timeout, Duration::from_secs(45));
}

#[test]
fn test_env_overrides() {
    let vars: HashMap<&str, &str> =
        HashMap::from([(ENV_VERBOSE, "yes"), (ENV_DEFAULT_TIMEOUT, "90s")]);
    let mut config = ShellConfig::default();
    config
        .apply_overrides_from(|key| vars.get(key).map(|value| (*value).to_string()))
        .expect("apply");
    assert!(config.verbose);
    assert_eq!(config.default_timeout, Duration::from_secs(90));

    let mut config = ShellConfig::default();
    let err = config
        .apply_overrides_from(|key| (key == ENV_DEFAULT_TIMEOUT).then(|| "forever".to_string()))
        .expect_err("bad override");
    assert!(err.to_string().contains(ENV_DEFAULT_TIMEOUT));
}

#[test]
fn test_default_config_path() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with(".shellkit/config.toml"));
    }
}
