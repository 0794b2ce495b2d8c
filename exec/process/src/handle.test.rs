use super::*;
use crate::builder::ProcessBuilder;
use crate::result::CompletionState;
use crate::verbosity::VerbosityFlag;
use pretty_assertions::assert_eq;
use std::sync::Mutex as StdMutex;

fn sh(script: &str) -> ProcessBuilder {
    ProcessBuilder::new("sh").arg("-c").arg(script)
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_captures_stdout_and_exit_code() {
    let handle = sh("echo hello; exit 3").build().expect("build");
    let result = handle.run().await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(handle.state(), ProcessState::Exited(3));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_separates_and_merges_streams() {
    let result = sh("echo out; echo err >&2")
        .build()
        .expect("build")
        .run()
        .await;
    assert_eq!(result.stdout.trim(), "out");
    assert_eq!(result.stderr.trim(), "err");
    assert!(result.merged.contains("out"));
    assert!(result.merged.contains("err"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_and_keeps_partial_output() {
    let handle = sh("echo started; sleep 30")
        .timeout(Duration::from_millis(300))
        .timeout_strategy(TimeoutStrategy::Fixed)
        .build()
        .expect("build");
    let start = Instant::now();
    let result = handle.run().await;

    assert_eq!(result.state, CompletionState::TimedOut);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.stdout.trim(), "started");
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(handle.has_exited());
}

#[tokio::test]
async fn test_missing_executable_is_start_failure() {
    let handle = ProcessBuilder::new("shellkit-definitely-not-a-real-binary")
        .build()
        .expect("build");
    let err = handle.start().await.expect_err("spawn should fail");
    assert!(matches!(err, ProcessError::StartFailure { .. }));
    assert_eq!(handle.state(), ProcessState::Created);

    let result = handle.run().await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::StartFailure));
}

#[cfg(unix)]
#[tokio::test]
async fn test_second_start_is_rejected() {
    let handle = sh("sleep 5").build().expect("build");
    handle.start().await.expect("first start");
    let err = handle.start().await.expect_err("second start");
    assert!(matches!(err, ProcessError::AlreadyStarted));
    handle.force_shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn test_send_input_and_clear_outputs() {
    let handle = ProcessBuilder::new("cat")
        .keep_stdin_open(true)
        .build()
        .expect("build");
    handle.start().await.expect("start");

    handle.send_input("first\n").await.expect("send");
    wait_until(|| handle.current_output().contains("first")).await;

    handle.clear_outputs();
    assert_eq!(handle.current_output(), "");

    handle.send_input("second\n").await.expect("send");
    wait_until(|| handle.current_output().contains("second")).await;
    assert!(!handle.current_merged_output().contains("first"));

    let taken = handle.take_outputs();
    assert_eq!(taken.stdout, "second\n");
    assert_eq!(handle.current_output(), "");

    handle.close_stdin().await;
    assert_eq!(handle.wait_for_exit().await.expect("wait"), 0);
}

#[tokio::test]
async fn test_send_input_without_stdin_fails() {
    let handle = ProcessBuilder::new("true").build().expect("build");
    let err = handle.send_input("x").await.expect_err("no stdin");
    assert!(matches!(err, ProcessError::StdinClosed));
}

#[cfg(unix)]
#[tokio::test]
async fn test_stdin_payload_is_delivered() {
    let result = ProcessBuilder::new("cat")
        .stdin("payload")
        .build()
        .expect("build")
        .run()
        .await;
    assert_eq!(result.stdout, "payload");
}

#[cfg(unix)]
#[tokio::test]
async fn test_force_shutdown_is_idempotent() {
    let handle = sh("sleep 30").build().expect("build");
    handle.start().await.expect("start");
    assert!(handle.is_running());

    handle.force_shutdown();
    let code = handle
        .wait_for_exit_timeout(Duration::from_secs(5))
        .await
        .expect("exited after kill");
    handle.force_shutdown();

    assert_eq!(handle.exit_code(), Some(code));
    assert!(!handle.is_running());
}

#[cfg(unix)]
#[tokio::test]
async fn test_start_after_shutdown_is_rejected() {
    let handle = sh("true").build().expect("build");
    handle.force_shutdown();
    let err = handle.start().await.expect_err("shut down");
    assert!(matches!(err, ProcessError::ShutDown));
}

#[cfg(unix)]
#[tokio::test]
async fn test_callbacks_receive_lines_and_events() {
    let lines = Arc::new(StdMutex::new(Vec::new()));
    let events = Arc::new(StdMutex::new(Vec::new()));
    let callbacks = ProcessCallbacks::new()
        .on_stdout({
            let lines = Arc::clone(&lines);
            move |line| lines.lock().expect("lock").push(format!("out:{line}"))
        })
        .on_stderr({
            let lines = Arc::clone(&lines);
            move |line| lines.lock().expect("lock").push(format!("err:{line}"))
        })
        .on_event({
            let events = Arc::clone(&events);
            move |event| events.lock().expect("lock").push(event.clone())
        });

    let result = sh("echo a; echo b >&2")
        .callbacks(callbacks)
        .build()
        .expect("build")
        .run()
        .await;
    assert_eq!(result.exit_code, 0);

    let mut lines = lines.lock().expect("lock").clone();
    lines.sort();
    assert_eq!(lines, vec!["err:b".to_string(), "out:a".to_string()]);

    let events = events.lock().expect("lock").clone();
    assert!(matches!(events.first(), Some(ProcessEvent::Started { .. })));
    assert_eq!(events.last(), Some(&ProcessEvent::Exited { exit_code: 0 }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_emits_event() {
    let timed_out = Arc::new(AtomicBool::new(false));
    let callbacks = ProcessCallbacks::new().on_event({
        let timed_out = Arc::clone(&timed_out);
        move |event| {
            if matches!(event, ProcessEvent::TimedOut { .. }) {
                timed_out.store(true, Ordering::SeqCst);
            }
        }
    });
    let result = sh("sleep 30")
        .timeout(Duration::from_millis(200))
        .callbacks(callbacks)
        .build()
        .expect("build")
        .run()
        .await;
    assert!(result.is_timed_out());
    assert!(timed_out.load(Ordering::SeqCst));
}

#[cfg(unix)]
#[tokio::test]
async fn test_cancellation_yields_canceled() {
    let token = CancellationToken::new();
    let handle = sh("sleep 30")
        .cancellation(token.clone())
        .build()
        .expect("build");
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });
    let result = handle.run().await;
    canceller.await.expect("cancel task panicked");
    assert_eq!(result.state, CompletionState::Canceled);
}

#[cfg(unix)]
#[tokio::test]
async fn test_progressive_timeout_extends_while_output_flows() {
    let result = sh("for i in 1 2 3 4 5; do echo $i; sleep 0.1; done")
        .timeout(Duration::from_millis(250))
        .timeout_strategy(TimeoutStrategy::Progressive)
        .build()
        .expect("build")
        .run()
        .await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.stdout.lines().count(), 5);
}

#[cfg(unix)]
#[tokio::test]
async fn test_verbose_echo_does_not_alter_capture() {
    let result = sh("echo loud")
        .verbosity(Arc::new(VerbosityFlag::new(true)))
        .build()
        .expect("build")
        .run()
        .await;
    assert_eq!(result.stdout, "loud\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_env_and_current_dir_are_applied() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let result = sh("echo \"$SHELLKIT_TEST_VAR\"; pwd")
        .env("SHELLKIT_TEST_VAR", "value-1")
        .current_dir(tmp.path())
        .build()
        .expect("build")
        .run()
        .await;
    let mut lines = result.stdout.lines();
    assert_eq!(lines.next(), Some("value-1"));
    let cwd = lines.next().expect("pwd line");
    let tmp_name = tmp
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .expect("temp dir name");
    assert!(cwd.ends_with(tmp_name), "cwd={cwd}");
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
