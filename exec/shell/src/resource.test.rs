use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_limits_exceeded() {
    let limits = ResourceLimits {
        max_memory_bytes: Some(1_000),
        max_cpu_percent: None,
    };
    assert!(!limits.is_exceeded_by(1_000, 99.0));
    assert!(limits.is_exceeded_by(1_001, 0.0));
    assert!(!ResourceLimits::default().is_exceeded_by(u64::MAX, f32::MAX));
}

#[test]
fn test_noop_monitor() {
    let monitor = NoopResourceMonitor;
    monitor.register(1, "bash-1", ShellFlavor::Posix);
    assert_eq!(monitor.usage("bash-1"), None);
    assert!(!monitor.set_limits("bash-1", ResourceLimits::default()));
}

#[test]
fn test_sysinfo_monitor_tracks_own_process() {
    let monitor = SysinfoResourceMonitor::new();
    monitor.register(std::process::id(), "self", ShellFlavor::Posix);
    assert_eq!(monitor.tracked_count(), 1);

    let usage = monitor.usage("self").expect("own process is visible");
    assert!(usage.memory_bytes > 0);
    assert!(!usage.limit_exceeded);

    assert!(monitor.set_limits(
        "self",
        ResourceLimits {
            max_memory_bytes: Some(1),
            max_cpu_percent: None,
        }
    ));
    assert!(monitor.usage("self").expect("usage").limit_exceeded);

    monitor.unregister("self");
    assert_eq!(monitor.usage("self"), None);
    assert!(!monitor.set_limits("self", ResourceLimits::default()));
}
