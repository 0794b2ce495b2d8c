use super::*;
use pretty_assertions::assert_eq;

const MARK: &str = "__SHELLKIT_MARK_abc__";

fn protocol() -> MarkerProtocol {
    MarkerProtocol::new(MARK.to_string()).expect("valid marker")
}

#[test]
fn test_new_marker_is_unique() {
    let a = new_marker();
    let b = new_marker();
    assert_ne!(a, b);
    assert!(a.starts_with("__SHELLKIT_MARK_"));
    assert!(a.ends_with("__"));
}

#[test]
fn test_find_completion_parses_exit_code() {
    let p = protocol();
    let text = format!("hi\n\n{MARK}0\n");
    assert_eq!(
        p.find_completion(&text, 0),
        Some(Completion {
            exit_code: Some(0),
            output_start: 0
        })
    );

    let text = format!("\n{MARK}-1\n");
    assert_eq!(p.find_completion(&text, 0).map(|c| c.exit_code), Some(Some(-1)));

    let text = format!("\n{MARK}127\n");
    assert_eq!(p.find_completion(&text, 0).map(|c| c.exit_code), Some(Some(127)));
}

#[test]
fn test_find_completion_waits_for_digits() {
    let p = protocol();
    assert_eq!(p.find_completion("still running\n", 0), None);
    assert_eq!(p.find_completion(&format!("\n{MARK}"), 0), None);
}

#[test]
fn test_unparseable_exit_code() {
    let p = protocol();
    let text = format!("\n{MARK}99999999999999\n");
    assert_eq!(
        p.find_completion(&text, 0).map(|c| c.exit_code),
        Some(None)
    );
}

#[test]
fn test_find_completion_skips_stale_markers() {
    let p = protocol();
    let text = format!("old\n\n{MARK}130\nnew\n\n{MARK}0\n");
    let completion = p.find_completion(&text, 1).expect("second marker");
    assert_eq!(completion.exit_code, Some(0));
    assert_eq!(&text[completion.output_start..], format!("new\n\n{MARK}0\n"));

    let only_stale = format!("old\n\n{MARK}130\n");
    assert_eq!(p.find_completion(&only_stale, 1), None);
}

#[test]
fn test_strip_removes_marker_line() {
    let p = protocol();
    assert_eq!(p.strip(&format!("hi\n\n{MARK}0\n"), 0), "hi\n");
    assert_eq!(p.strip(&format!("hi\n{MARK}0\n"), 0), "hi");
    assert_eq!(p.strip(&format!("\n{MARK}0\n"), 0), "");
    assert_eq!(p.strip(&format!("out\r\n\r\n{MARK}0\r\n"), 0), "out\r\n");
}

#[test]
fn test_strip_from_offset_and_leftovers() {
    let p = protocol();
    let text = format!("old\n\n{MARK}1\nnew\n\n{MARK}0\n");
    let start = p.find_completion(&text, 1).expect("found").output_start;
    assert_eq!(p.strip(&text, start), "new\n");

    // A marker with no digits is still never returned to the caller.
    assert_eq!(p.strip(&format!("a\n{MARK}\nb\n"), 0), "a\nb\n");
}

#[test]
fn test_count() {
    let p = protocol();
    assert_eq!(p.count("nothing"), 0);
    assert_eq!(p.count(&format!("{MARK}1\n{MARK}2\n")), 2);
}

#[test]
fn test_classify_abort() {
    let timeout = Duration::from_millis(500);
    assert_eq!(classify_abort(Duration::from_millis(500), timeout), AbortKind::TimedOut);
    assert_eq!(classify_abort(Duration::from_millis(450), timeout), AbortKind::TimedOut);
    assert_eq!(classify_abort(Duration::from_millis(560), timeout), AbortKind::TimedOut);
    assert_eq!(classify_abort(Duration::from_millis(100), timeout), AbortKind::Canceled);
    assert_eq!(classify_abort(Duration::from_millis(700), timeout), AbortKind::Canceled);
}

#[test]
fn test_output_start_waits_for_stale_markers() {
    let p = protocol();
    assert_eq!(p.output_start("anything", 0), Some(0));
    assert_eq!(p.output_start("late output\n", 1), None);
    let text = format!("late\n\n{MARK}130\nfresh\n");
    assert_eq!(&text[p.output_start(&text, 1).expect("stale seen")..], "fresh\n");
}
