use super::*;
use pretty_assertions::assert_eq;
use shellkit_process::CapturedOutput;

fn completed(merged: &str, exit_code: i32) -> CommandResult {
    CommandResult::completed(
        CapturedOutput {
            stdout: merged.to_string(),
            stderr: String::new(),
            merged: merged.to_string(),
        },
        exit_code,
        Duration::from_millis(5),
    )
}

#[test]
fn test_render_completed() {
    assert_eq!(render(&completed("hi\n", 0)), "hi\n");
    assert_eq!(render(&completed("oops\n", 2)), "oops\n\nExit code: 2");
}

#[test]
fn test_render_diagnostic() {
    let result = completed("", 2).with_diagnostic(
        FailureKind::SyntaxError,
        "bash: eval: line 1: unexpected EOF",
    );
    assert_eq!(
        render(&result),
        "\nExit code: 2\nbash: eval: line 1: unexpected EOF"
    );
}

#[test]
fn test_render_timeout_and_error() {
    let timed_out = CommandResult::timed_out(CapturedOutput::default(), Duration::from_secs(1));
    assert_eq!(render(&timed_out), TIMEOUT_RESET_MESSAGE);

    let error = CommandResult::error(FailureKind::Internal, "boom", Duration::ZERO);
    assert_eq!(render(&error), "boom");
}

#[cfg(unix)]
#[tokio::test]
async fn test_session_keeps_state_until_exit() {
    let session = ShellSession::new();
    session.run_bash_command("export SESSION_VAR=kept", None).await;
    assert_eq!(session.run_bash_command("echo $SESSION_VAR", None).await, "kept\n");
    assert!(session.has_session(ShellFlavor::Posix));

    assert_eq!(
        session.run_bash_command("exit", None).await,
        "<bash session terminated>"
    );
    assert!(!session.has_session(ShellFlavor::Posix));
    assert_eq!(session.run_bash_command("echo ${SESSION_VAR:-gone}", None).await, "gone\n");
    session.close();
}

#[cfg(unix)]
#[tokio::test]
async fn test_session_reports_exit_code() {
    let session = ShellSession::new();
    let output = session.run_bash_command("echo nope >&2; false", None).await;
    assert_eq!(output, "nope\n\nExit code: 1");
    session.close();
}

#[cfg(unix)]
#[tokio::test]
async fn test_session_timeout_resets_environment() {
    let session = ShellSession::new();
    session.run_bash_command("export SESSION_VAR=lost", None).await;
    let output = session
        .run_bash_command("sleep 30", Some(Duration::from_millis(300)))
        .await;
    assert_eq!(output, TIMEOUT_RESET_MESSAGE);
    assert!(!session.has_session(ShellFlavor::Posix));
    assert_eq!(session.run_bash_command("echo ${SESSION_VAR:-reset}", None).await, "reset\n");
    session.close();
}

#[cfg(unix)]
#[tokio::test]
async fn test_close_drops_every_session() {
    let session = ShellSession::new();
    session.run_bash_command("true", None).await;
    session.close();
    assert!(!session.has_session(ShellFlavor::Posix));
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_calls_on_one_flavor_are_serialized() {
    let session = ShellSession::new();
    let (slow, fast) = tokio::join!(
        session.run_bash_command("sleep 0.5; echo AAA", None),
        session.run_bash_command("echo BBB", None),
    );
    assert_eq!(slow, "AAA\n");
    assert_eq!(fast, "BBB\n");
    session.close();
}
