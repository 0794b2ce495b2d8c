use super::*;
use crate::config::ManagerConfig;
use crate::resource::SysinfoResourceMonitor;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use shellkit_process::CompletionState;

fn manager() -> Arc<ShellManager> {
    Arc::new(ShellManager::new())
}

async fn create(manager: &ShellManager, name: &str) -> String {
    manager
        .create_shell(ShellFlavor::Posix, Some(name.to_string()), None, BTreeMap::new())
        .await
        .expect("create shell")
}

#[test]
fn test_next_shell_name_picks_first_gap() {
    let taken = ["bash-1", "bash-2", "bash-4"];
    assert_eq!(
        next_shell_name(ShellFlavor::Posix, |name| taken.contains(&name)),
        "bash-3"
    );
    assert_eq!(next_shell_name(ShellFlavor::Cmd, |_| false), "cmd-1");
}

#[test]
fn test_auto_promoted_name_format() {
    let now = Utc
        .with_ymd_and_hms(2026, 3, 9, 14, 5, 7)
        .single()
        .expect("valid time");
    assert_eq!(
        auto_promoted_name(ShellFlavor::PowerShell, now, 0x0a1f),
        "powershell-auto-20260309140507-0a1f"
    );
}

#[test]
fn test_busy_guard_only_clears_its_own_slot() {
    let manager = ShellManager::new();
    let first = manager
        .try_mark_busy("s1", ShellCommandInfo::new("first", Duration::ZERO))
        .expect("free");
    let blocking = manager
        .try_mark_busy("s1", ShellCommandInfo::new("second", Duration::ZERO))
        .err()
        .expect("busy");
    assert_eq!(blocking.command, "first");

    // Simulate a terminate that cleared the slot and a new command taking it.
    manager.busy.remove("s1");
    let _second = manager
        .try_mark_busy("s1", ShellCommandInfo::new("second", Duration::ZERO))
        .expect("free again");
    drop(first);
    assert_eq!(
        manager.busy_command("s1").map(|info| info.command),
        Some("second".to_string())
    );
}

#[tokio::test]
async fn test_unknown_shell_operations() {
    let manager = manager();
    let result = manager.execute_in_shell("nope", "echo hi", None, None).await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::NotFound));

    assert!(matches!(
        manager.rename_shell("nope", "other"),
        Err(ShellError::NotFound(_))
    ));
    assert!(matches!(
        manager.terminate_shell("nope", true).await,
        Err(ShellError::NotFound(_))
    ));
    assert_eq!(manager.shell_state("nope"), None);
    assert!(!manager.wait_for_shell_availability("nope", Duration::from_millis(10)).await);
}

#[tokio::test]
async fn test_create_validates_inputs() {
    let manager = manager();
    let err = manager
        .create_shell(
            ShellFlavor::Posix,
            None,
            Some(PathBuf::from("/definitely/not/a/dir")),
            BTreeMap::new(),
        )
        .await
        .expect_err("bad dir");
    assert!(matches!(err, ShellError::InvalidWorkingDirectory(_)));

    let err = manager
        .create_shell(
            ShellFlavor::Posix,
            None,
            None,
            BTreeMap::from([("BAD=KEY".to_string(), "x".to_string())]),
        )
        .await
        .expect_err("bad env key");
    assert!(matches!(err, ShellError::InvalidEnvKey(_)));
    assert!(manager.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_echo_in_named_shell() {
    let manager = manager();
    let name = create(&manager, "s1").await;
    assert_eq!(name, "s1");

    let result = manager.execute_in_shell("s1", "echo hi", None, None).await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(manager.shell_state("s1"), Some(ShellState::Idle));

    let err = manager
        .create_shell(ShellFlavor::Posix, Some("s1".to_string()), None, BTreeMap::new())
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ShellError::AlreadyExists(_)));
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_generated_names_and_listing() {
    let manager = manager();
    let first = manager
        .create_shell(ShellFlavor::Posix, None, None, BTreeMap::new())
        .await
        .expect("create");
    let second = manager
        .create_shell(ShellFlavor::Posix, None, None, BTreeMap::new())
        .await
        .expect("create");
    assert_eq!(first, "bash-1");
    assert_eq!(second, "bash-2");

    manager.terminate_shell("bash-1", true).await.expect("terminate");
    let third = manager
        .create_shell(ShellFlavor::Posix, None, None, BTreeMap::new())
        .await
        .expect("create");
    assert_eq!(third, "bash-1");

    let names: Vec<String> = manager.list_shells().into_iter().map(|info| info.name).collect();
    assert_eq!(names, vec!["bash-1".to_string(), "bash-2".to_string()]);
    let info = manager.shell_info("bash-2").expect("info");
    assert_eq!(info.flavor, ShellFlavor::Posix);
    assert!(info.alive);
    assert!(!info.busy);
    assert!(!info.auto_promoted);
    assert_eq!(info.idle_timeout, Duration::from_secs(2 * 60 * 60));
    manager.shutdown_all();
    assert!(manager.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_setup_applies_directory_and_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dir = dir.path().canonicalize().expect("canonicalize");
    let manager = manager();
    let name = manager
        .create_shell(
            ShellFlavor::Posix,
            Some("configured".to_string()),
            Some(dir.clone()),
            BTreeMap::from([("SHELLKIT_SETUP".to_string(), "it's set".to_string())]),
        )
        .await
        .expect("create");
    let result = manager
        .execute_in_shell(&name, "pwd; echo \"$SHELLKIT_SETUP\"", None, None)
        .await;
    assert_eq!(result.stdout, format!("{}\nit's set\n", dir.display()));
    assert_eq!(manager.shell_info(&name).and_then(|info| info.working_dir), Some(dir));
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_removes_shell() {
    let manager = manager();
    create(&manager, "s1").await;
    let result = manager
        .execute_in_shell("s1", "sleep 5", Some(Duration::from_millis(500)), None)
        .await;
    assert_eq!(result.state, CompletionState::TimedOut);

    let result = manager.execute_in_shell("s1", "echo hi", None, None).await;
    assert_eq!(result.failure, Some(FailureKind::NotFound));
    assert!(manager.shell_info("s1").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_command_gets_busy() {
    let manager = manager();
    create(&manager, "s1").await;

    let background = Arc::clone(&manager);
    let first = tokio::spawn(async move {
        background
            .execute_in_shell("s1", "sleep 1; echo first", None, None)
            .await
    });
    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.busy_command("s1").is_none() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let result = manager.execute_in_shell("s1", "echo second", None, None).await;
    assert_eq!(result.state, CompletionState::Error);
    assert_eq!(result.failure, Some(FailureKind::Busy));
    assert!(result.stderr.contains("sleep 1; echo first"));
    assert!(matches!(
        manager.shell_state("s1"),
        Some(ShellState::Busy { ref command, .. }) if command == "sleep 1; echo first"
    ));
    assert!(matches!(
        manager.rename_shell("s1", "s2"),
        Err(ShellError::Busy { .. })
    ));

    let waited = manager
        .execute_in_shell("s1", "echo second", None, Some(Duration::from_secs(5)))
        .await;
    assert_eq!(waited.stdout, "second\n");

    let first = first.await.expect("join");
    assert_eq!(first.stdout, "first\n");
    assert!(manager.busy_command("s1").is_none());
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_wait_for_shell_availability() {
    let manager = manager();
    create(&manager, "s1").await;
    assert!(manager.wait_for_shell_availability("s1", Duration::ZERO).await);

    let background = Arc::clone(&manager);
    let running = tokio::spawn(async move {
        background.execute_in_shell("s1", "sleep 0.5", None, None).await
    });
    while manager.busy_command("s1").is_none() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!manager.wait_for_shell_availability("s1", Duration::from_millis(100)).await);
    assert!(manager.wait_for_shell_availability("s1", Duration::from_secs(5)).await);
    running.await.expect("join");
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_rename_shell() {
    let manager = manager();
    create(&manager, "s1").await;
    create(&manager, "taken").await;

    assert!(matches!(
        manager.rename_shell("s1", "taken"),
        Err(ShellError::AlreadyExists(_))
    ));
    assert!(manager.shell_info("s1").is_some());

    manager.rename_shell("s1", "s2").expect("rename");
    assert!(manager.shell_info("s1").is_none());
    let result = manager.execute_in_shell("s2", "echo renamed", None, None).await;
    assert_eq!(result.stdout, "renamed\n");
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_unmatched_quote_gives_diagnostic_and_shell_survives() {
    let manager = manager();
    create(&manager, "s1").await;
    let result = manager
        .execute_in_shell("s1", "echo 'unterminated", None, None)
        .await;
    assert_eq!(result.state, CompletionState::Completed);
    assert_eq!(result.failure, Some(FailureKind::SyntaxError));
    assert!(result.diagnostic.is_some());
    assert_ne!(result.exit_code, 0);

    let result = manager.execute_in_shell("s1", "echo ok", None, None).await;
    assert_eq!(result.stdout, "ok\n");
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_exit_removes_shell() {
    let manager = manager();
    create(&manager, "s1").await;
    let result = manager.execute_in_shell("s1", "exit 3", None, None).await;
    assert_eq!(result.failure, Some(FailureKind::ShellExited));
    assert!(manager.shell_info("s1").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_idle_cleanup_skips_busy_shells() {
    let config = ShellConfig {
        manager: ManagerConfig {
            idle_timeout: Duration::from_millis(200),
            ..ManagerConfig::default()
        },
        ..ShellConfig::default()
    };
    let manager = Arc::new(ShellManager::with_config(config, Arc::new(NoopResourceMonitor)));
    create(&manager, "idle").await;
    create(&manager, "busy").await;

    let background = Arc::clone(&manager);
    let running = tokio::spawn(async move {
        background.execute_in_shell("busy", "sleep 1", None, None).await
    });
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(manager.busy_command("busy").is_some());

    assert_eq!(manager.cleanup_idle_shells(), vec!["idle".to_string()]);
    assert!(manager.shell_info("idle").is_none());
    assert!(manager.shell_info("busy").is_some());

    let result = running.await.expect("join");
    assert_eq!(result.state, CompletionState::Completed);
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_periodic_cleanup_task() {
    let config = ShellConfig {
        manager: ManagerConfig {
            idle_timeout: Duration::from_millis(100),
            cleanup_interval: Duration::from_millis(100),
            ..ManagerConfig::default()
        },
        ..ShellConfig::default()
    };
    let manager = Arc::new(ShellManager::with_config(config, Arc::new(NoopResourceMonitor)));
    create(&manager, "s1").await;
    manager.start_idle_cleanup();

    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.shell_info("s1").is_some() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(manager.is_empty());
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_resource_monitor_follows_shell_lifecycle() {
    let monitor = Arc::new(SysinfoResourceMonitor::new());
    let manager = ShellManager::with_config(ShellConfig::default(), monitor.clone());
    create(&manager, "s1").await;
    assert!(manager.resource_usage("s1").is_some());
    assert!(manager.set_resource_limits("s1", ResourceLimits::default()));

    manager.rename_shell("s1", "s2").expect("rename");
    assert!(manager.resource_usage("s1").is_none());
    assert!(manager.resource_usage("s2").is_some());

    manager.terminate_shell("s2", false).await.expect("terminate");
    assert_eq!(monitor.tracked_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_auto_promotion_runs_command_in_background() {
    let manager = manager();
    let outcome = manager
        .run_command_or_promote(
            ShellFlavor::Posix,
            "sleep 1; echo promoted",
            Duration::from_millis(300),
            None,
        )
        .await
        .expect("run");
    assert_eq!(outcome.result.state, CompletionState::TimedOut);
    let name = outcome.promoted_shell.expect("promoted");
    assert!(name.starts_with("bash-auto-"));

    let info = manager.shell_info(&name).expect("registered");
    assert!(info.auto_promoted);
    assert_eq!(info.idle_timeout, Duration::from_secs(30 * 60));
    assert!(manager.busy_command(&name).is_some());

    assert!(manager.wait_for_shell_availability(&name, Duration::from_secs(10)).await);
    let last = manager.last_result(&name).expect("stored result");
    assert_eq!(last.stdout, "promoted\n");
    assert_eq!(last.exit_code, 0);
    manager.shutdown_all();
}

#[cfg(unix)]
#[tokio::test]
async fn test_fast_command_is_not_promoted() {
    let manager = manager();
    let outcome = manager
        .run_command_or_promote(ShellFlavor::Posix, "echo quick", Duration::from_secs(10), None)
        .await
        .expect("run");
    assert_eq!(outcome.result.stdout, "quick\n");
    assert_eq!(outcome.promoted_shell, None);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_panic_becomes_error_result() {
    let result = AssertUnwindSafe(async { panic!("boom") })
        .catch_unwind()
        .await
        .map_err(|panic| panic_message(panic.as_ref()));
    assert_eq!(result, Err("boom".to_string()));
}
