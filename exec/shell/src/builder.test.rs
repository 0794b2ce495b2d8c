use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_defaults() {
    let builder = PersistentShellBuilder::new();
    assert_eq!(builder.flavor, ShellFlavor::platform_default());
    assert_eq!(builder.settings.default_timeout, Duration::from_secs(30));
    assert_eq!(builder.settings.poll_interval, DEFAULT_POLL_INTERVAL);
    assert_eq!(builder.settings.verification_timeout, DEFAULT_VERIFICATION_TIMEOUT);
    assert_eq!(builder.settings.timeout_strategy, TimeoutStrategy::Progressive);
}

#[test]
fn test_shell_type_sets_flavor() {
    let builder = PersistentShellBuilder::new().shell_type(ShellType::PowerShell);
    assert_eq!(builder.flavor, ShellFlavor::PowerShell);
    let builder = builder.flavor(ShellFlavor::Posix);
    assert_eq!(builder.shell_type, None);
}

#[test]
fn test_from_config() {
    let config = ShellConfig {
        default_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        timeout_strategy: TimeoutStrategy::Fixed,
        default_flavor: Some(ShellFlavor::PowerShell),
        ..ShellConfig::default()
    };
    let builder = PersistentShellBuilder::from_config(&config);
    assert_eq!(builder.flavor, ShellFlavor::PowerShell);
    assert_eq!(builder.settings.default_timeout, Duration::from_secs(5));
    assert_eq!(builder.settings.poll_interval, Duration::from_millis(10));
    assert_eq!(builder.settings.timeout_strategy, TimeoutStrategy::Fixed);
    assert!(builder.verbosity.is_some());
}

#[test]
fn test_zero_durations_are_rejected() {
    let err = PersistentShellBuilder::new()
        .timeout(Duration::ZERO)
        .build()
        .expect_err("zero timeout");
    assert!(matches!(err, ShellError::Config(_)));

    let err = PersistentShellBuilder::new()
        .poll_interval(Duration::ZERO)
        .build()
        .expect_err("zero poll interval");
    assert!(matches!(err, ShellError::Config(_)));
}

#[test]
fn test_unresolvable_executable_is_config_error() {
    let err = PersistentShellBuilder::new()
        .executable("/definitely/not/here/bash")
        .build()
        .expect_err("missing executable");
    assert!(matches!(err, ShellError::Config(_)));

    let err = PersistentShellBuilder::new()
        .shell_type(ShellType::Bash)
        .executable("/definitely/not/here/mybash")
        .build()
        .expect_err("missing executable");
    assert!(matches!(err, ShellError::Config(_)));
}

#[cfg(unix)]
#[test]
fn test_build_configures_startup_args() {
    let Some(bash) = get_shell(ShellType::Bash, None) else {
        return;
    };
    let shell = PersistentShellBuilder::new()
        .executable(&bash.shell_path)
        .build()
        .expect("build");
    assert_eq!(shell.shell().shell_type, ShellType::Bash);
    assert_eq!(shell.shell().startup_args(), vec!["--noprofile", "--norc"]);
    assert!(shell.marker().starts_with("__SHELLKIT_MARK_"));
}

#[cfg(unix)]
#[test]
fn test_invalid_working_directory_fails_build() {
    let err = PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .current_dir("/definitely/not/a/dir")
        .build()
        .expect_err("bad dir");
    assert!(matches!(err, ShellError::Process(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_executes_one_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path().canonicalize().expect("canonicalize");
    let result = PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .current_dir(&dir)
        .env("SHELLKIT_BUILDER_VAR", "value")
        .run("pwd; echo $SHELLKIT_BUILDER_VAR")
        .await
        .expect("run");
    assert_eq!(result.stdout, format!("{}\nvalue\n", dir.display()));
}
