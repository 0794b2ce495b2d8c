use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_arguments_are_shell_split() {
    let handle = ProcessBuilder::new("git")
        .arguments(r#"commit -m "two words""#)
        .arg("--quiet")
        .build()
        .expect("build");
    assert_eq!(
        handle.args(),
        &["commit".to_string(), "-m".to_string(), "two words".to_string(), "--quiet".to_string()]
    );
}

#[test]
fn test_unbalanced_arguments_fail_at_build() {
    let err = ProcessBuilder::new("echo")
        .arguments("'unterminated")
        .build()
        .expect_err("should fail");
    assert!(matches!(err, ProcessError::Config(_)));
}

#[test]
fn test_empty_program_is_rejected() {
    let err = ProcessBuilder::new("  ").build().expect_err("should fail");
    assert!(matches!(err, ProcessError::Config(_)));
}

#[test]
fn test_invalid_env_key_is_rejected() {
    let err = ProcessBuilder::new("env")
        .env("A=B", "x")
        .build()
        .expect_err("should fail");
    assert!(err.to_string().contains("A=B"));
}

#[test]
fn test_missing_working_directory_is_rejected() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let missing = tmp.path().join("does-not-exist");
    let err = ProcessBuilder::new("pwd")
        .current_dir(&missing)
        .build()
        .expect_err("should fail");
    assert!(matches!(err, ProcessError::Config(_)));
}

#[test]
fn test_zero_timeout_is_rejected() {
    let err = ProcessBuilder::new("true")
        .timeout(Duration::ZERO)
        .build()
        .expect_err("should fail");
    assert!(matches!(err, ProcessError::Config(_)));
}

#[test]
fn test_defaults() {
    let handle = ProcessBuilder::new("true").build().expect("build");
    assert_eq!(handle.timeout(), Some(DEFAULT_TIMEOUT));
    assert_eq!(handle.timeout_strategy(), TimeoutStrategy::Progressive);
}

#[test]
fn test_env_key_validation() {
    assert!(is_valid_env_key("PATH"));
    assert!(is_valid_env_key("_under_score1"));
    assert!(!is_valid_env_key(""));
    assert!(!is_valid_env_key("A=B"));
    assert!(!is_valid_env_key("NUL\0"));
}

#[cfg(unix)]
#[test]
fn test_run_blocking() {
    let result = ProcessBuilder::new("sh")
        .arg("-c")
        .arg("echo blocking")
        .run_blocking()
        .expect("run");
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.trim(), "blocking");
}
