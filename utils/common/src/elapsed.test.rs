use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_format_duration_subsecond() {
    assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
    assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
}

#[test]
fn test_format_duration_seconds() {
    assert_eq!(format_duration(Duration::from_millis(1_000)), "1.00s");
    assert_eq!(format_duration(Duration::from_millis(1_500)), "1.50s");
    assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
}

#[test]
fn test_format_duration_minutes() {
    assert_eq!(format_duration(Duration::from_millis(60_000)), "1m 00s");
    assert_eq!(format_duration(Duration::from_millis(75_000)), "1m 15s");
    assert_eq!(format_duration(Duration::from_secs(3_601)), "60m 01s");
}

#[test]
fn test_format_elapsed_is_short_for_fresh_instant() {
    let formatted = format_elapsed(Instant::now());
    assert!(formatted.ends_with("ms"), "got {formatted}");
}

#[test]
fn test_format_millis_clamps_negative() {
    assert_eq!(format_millis(-5), "0ms");
    assert_eq!(format_millis(2_250), "2.25s");
}
