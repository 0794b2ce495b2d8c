use super::*;
use crate::builder::PersistentShellBuilder;
use crate::shell_types::ShellType;
use pretty_assertions::assert_eq;
use shellkit_process::CompletionState;

/// Exit is published by the waiter task shortly after the kill.
async fn wait_until_dead(shell: &PersistentShell) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while shell.is_alive() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

fn posix_shell() -> PersistentShell {
    PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build posix shell")
}

#[cfg(unix)]
#[tokio::test]
async fn test_echo_returns_clean_output() {
    let shell = posix_shell();
    let result = shell.execute("echo hi").await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.merged, "hi\n");
    assert!(shell.is_verified());
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_exit_codes_are_reported() {
    let shell = posix_shell();
    assert_eq!(shell.execute("true").await.exit_code, 0);
    assert_eq!(shell.execute("false").await.exit_code, 1);
    let result = shell.execute("sh -c 'exit 7'").await;
    assert_eq!(result.exit_code, 7);
    assert_eq!(result.state, CompletionState::Completed);
    assert!(!result.success());
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_marker_never_leaks() {
    let shell = posix_shell();
    let result = shell
        .execute("printf 'no trailing newline'; echo err >&2")
        .await;
    assert!(!result.stdout.contains(shell.marker()));
    assert!(!result.merged.contains(shell.marker()));
    assert!(result.stdout.starts_with("no trailing newline"));
    assert_eq!(result.stderr.trim(), "err");
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_state_persists_between_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path().canonicalize().expect("canonicalize");
    let shell = posix_shell();

    let cd = shell.flavor().cd_command(&dir);
    assert!(shell.execute(&cd).await.success());
    assert!(shell.execute("export SHELLKIT_TEST_VAR='two words'").await.success());

    let result = shell.execute("pwd; echo \"$SHELLKIT_TEST_VAR\"").await;
    assert_eq!(
        result.stdout,
        format!("{}\ntwo words\n", dir.display())
    );
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_stdin_is_attached_through_heredoc() {
    let shell = posix_shell();
    let result = shell
        .execute_with(ShellCommand::new("cat").with_stdin("line one\nit's line two"))
        .await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "line one\nit's line two\n");

    let result = shell
        .execute_with(ShellCommand::new("cat\n").with_stdin("hello"))
        .await;
    assert_eq!(result.stdout, "hello\n");

    // Commands without stdin must not read the shell's own input.
    let result = shell.execute("cat; echo done").await;
    assert_eq!(result.stdout, "done\n");
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_syntax_error_sets_diagnostic_and_keeps_shell() {
    let shell = posix_shell();
    let result = shell.execute("echo \"unterminated").await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.failure, Some(FailureKind::SyntaxError));
    assert!(result.diagnostic.is_some());
    assert_ne!(result.exit_code, 0);

    let result = shell.execute("echo still alive").await;
    assert_eq!(result.stdout, "still alive\n");
    assert_eq!(result.failure, None);
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_error_text_on_stdout_keeps_exit_code() {
    let shell = posix_shell();
    let result = shell
        .execute("echo 'log line: syntax error near token'")
        .await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.failure, None);
    assert_eq!(result.diagnostic, None);
    assert_eq!(result.stdout, "log line: syntax error near token\n");

    // A diagnostic on stderr is reported next to the real status.
    let result = shell.execute("echo 'parse error' >&2; (exit 3)").await;
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.failure, Some(FailureKind::SyntaxError));
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_shell() {
    let shell = PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .timeout_strategy(TimeoutStrategy::Fixed)
        .build()
        .expect("build");
    let start = Instant::now();
    let result = shell
        .execute_with(
            ShellCommand::new("echo partial; sleep 30").with_timeout(Duration::from_millis(500)),
        )
        .await;
    assert_eq!(result.state, CompletionState::TimedOut);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.failure, Some(FailureKind::Timeout));
    assert_eq!(result.stdout.trim(), "partial");
    assert!(start.elapsed() < Duration::from_secs(10));

    let after = shell.execute("echo again").await;
    assert_eq!(after.state, CompletionState::Error);
    assert!(wait_until_dead(&shell).await);
}

#[cfg(unix)]
#[tokio::test]
async fn test_progressive_timeout_extends_while_output_flows() {
    let script = "for i in 1 2 3 4 5; do echo $i; sleep 0.2; done";

    let progressive = PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .timeout(Duration::from_millis(600))
        .timeout_strategy(TimeoutStrategy::Progressive)
        .build()
        .expect("build");
    let result = progressive.execute(script).await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.stdout, "1\n2\n3\n4\n5\n");
    progressive.force_shutdown();

    let fixed = PersistentShellBuilder::new()
        .flavor(ShellFlavor::Posix)
        .timeout(Duration::from_millis(600))
        .timeout_strategy(TimeoutStrategy::Fixed)
        .build()
        .expect("build");
    let result = fixed.execute(script).await;
    assert_eq!(result.state, CompletionState::TimedOut);
}

#[cfg(unix)]
#[tokio::test]
async fn test_cancellation_leaves_shell_usable() {
    let shell = posix_shell();
    shell.ensure_ready().await.expect("ready");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });
    let result = shell
        .execute_with(
            ShellCommand::new("echo stale; sleep 1")
                .with_timeout(Duration::from_secs(10))
                .with_cancellation(token),
        )
        .await;
    assert_eq!(result.state, CompletionState::Canceled);
    assert!(shell.is_alive());
    assert_eq!(shell.stale_marker_count(), 1);

    let result = shell.execute("echo fresh").await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "fresh\n");
    assert_eq!(shell.stale_marker_count(), 0);
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_late_marker_from_canceled_command_is_consumed() {
    let shell = posix_shell();
    shell.ensure_ready().await.expect("ready");

    let token = CancellationToken::new();
    token.cancel();
    let result = shell
        .execute_with(ShellCommand::new("sleep 0.3; echo late").with_cancellation(token))
        .await;
    assert_eq!(result.state, CompletionState::Canceled);
    assert_eq!(shell.stale_marker_count(), 1);

    // The canceled command finishes and prints its marker before the next
    // command is sent.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let result = shell
        .execute_with(ShellCommand::new("echo fresh").with_timeout(Duration::from_secs(5)))
        .await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.stdout, "fresh\n");
    assert_eq!(shell.stale_marker_count(), 0);
    assert!(shell.is_alive());
    shell.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_cancel_at_timeout_is_treated_as_timeout() {
    let shell = posix_shell();
    shell.ensure_ready().await.expect("ready");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        canceller.cancel();
    });
    let result = shell
        .execute_with(
            ShellCommand::new("sleep 30")
                .with_timeout(Duration::from_millis(1_050))
                .with_cancellation(token),
        )
        .await;
    assert_eq!(result.state, CompletionState::TimedOut);
    assert!(wait_until_dead(&shell).await);
}

#[cfg(unix)]
#[tokio::test]
async fn test_verification_failure_kills_shell() {
    // `cat` echoes the wrapped command back but never prints a marker.
    let shell = PersistentShellBuilder::new()
        .shell_type(ShellType::Sh)
        .executable("/bin/cat")
        .verification_timeout(Duration::from_millis(300))
        .timeout_strategy(TimeoutStrategy::Fixed)
        .build()
        .expect("build");
    let result = shell.execute("echo hi").await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::VerificationFailed));
    assert!(!shell.is_verified());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unspawnable_executable_is_start_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fake = dir.path().join("bash");
    std::fs::write(&fake, "not a program").expect("write");
    let shell = PersistentShellBuilder::new()
        .executable(&fake)
        .build()
        .expect("build");
    let result = shell.execute("echo hi").await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::StartFailure));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unexpected_exit_is_reported() {
    let shell = posix_shell();
    let result = shell.execute("exit 4").await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::ShellExited));
    assert!(wait_until_dead(&shell).await);
}

#[cfg(unix)]
#[tokio::test]
async fn test_graceful_shutdown() {
    let shell = posix_shell();
    shell.ensure_ready().await.expect("ready");
    assert!(shell.pid().is_some());
    shell.shutdown(true).await;
    assert!(!shell.is_alive());
    shell.force_shutdown();
}

#[test]
fn test_shell_command_builders() {
    let token = CancellationToken::new();
    let command = ShellCommand::from("ls")
        .with_timeout(Duration::from_secs(3))
        .with_stdin("x")
        .with_cancellation(token);
    assert_eq!(command.command, "ls");
    assert_eq!(command.timeout, Some(Duration::from_secs(3)));
    assert_eq!(command.stdin.as_deref(), Some("x"));
    assert!(command.cancel.is_some());
}
