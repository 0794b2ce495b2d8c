use super::*;
use pretty_assertions::assert_eq;

fn output(stdout: &str) -> CapturedOutput {
    CapturedOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        merged: stdout.to_string(),
    }
}

#[test]
fn test_completed_success() {
    let result = CommandResult::completed(output("hi\n"), 0, Duration::from_millis(12));
    assert!(result.success());
    assert_eq!(result.duration_ms, 12);
    assert_eq!(result.failure, None);
    assert_eq!(result.failure_message(), None);
}

#[test]
fn test_completed_non_zero_is_not_success() {
    let result = CommandResult::completed(output(""), 3, Duration::ZERO);
    assert!(!result.success());
    assert_eq!(result.state, CompletionState::Completed);
}

#[test]
fn test_timed_out_keeps_partial_output() {
    let result = CommandResult::timed_out(output("partial"), Duration::from_millis(500));
    assert!(result.is_timed_out());
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.stdout, "partial");
    assert_eq!(result.failure, Some(FailureKind::Timeout));
    assert_eq!(
        result.failure_message(),
        Some("Command timed out after 500ms".to_string())
    );
}

#[test]
fn test_error_carries_message() {
    let result = CommandResult::error(FailureKind::NotFound, "Shell 'x' not found", Duration::ZERO);
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.stderr, "Shell 'x' not found");
    assert_eq!(result.exception.as_deref(), Some("Shell 'x' not found"));
    assert_eq!(result.failure, Some(FailureKind::NotFound));
}

#[test]
fn test_diagnostic_does_not_replace_output() {
    let result = CommandResult::completed(output("before"), 2, Duration::ZERO)
        .with_diagnostic(FailureKind::SyntaxError, "syntax error near `('");
    assert_eq!(result.stdout, "before");
    assert_eq!(result.failure, Some(FailureKind::SyntaxError));
    assert_eq!(result.failure_message().as_deref(), Some("syntax error near `('"));
}

#[test]
fn test_serializes_states_in_snake_case() {
    let result = CommandResult::timed_out(CapturedOutput::default(), Duration::ZERO);
    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["state"], "timed_out");
    assert_eq!(json["failure"], "timeout");
    assert!(json.get("diagnostic").is_none());
}
