use super::*;
use pretty_assertions::assert_eq;

const SEC: Duration = Duration::from_secs(1);

#[test]
fn test_fixed_ignores_output() {
    let start = Instant::now();
    let deadline = TimeoutStrategy::Fixed.deadline(start, Some(start + 5 * SEC), 10 * SEC);
    assert_eq!(deadline, start + 10 * SEC);
}

#[test]
fn test_progressive_without_output_matches_fixed() {
    let start = Instant::now();
    assert_eq!(
        TimeoutStrategy::Progressive.deadline(start, None, 10 * SEC),
        start + 10 * SEC
    );
}

#[test]
fn test_progressive_extends_after_output() {
    let start = Instant::now();
    let deadline = TimeoutStrategy::Progressive.deadline(start, Some(start + 8 * SEC), 10 * SEC);
    assert_eq!(deadline, start + 18 * SEC);
}

#[test]
fn test_progressive_is_capped() {
    let start = Instant::now();
    let deadline = TimeoutStrategy::Progressive.deadline(start, Some(start + 39 * SEC), 10 * SEC);
    assert_eq!(deadline, start + 40 * SEC);
}

#[test]
fn test_progressive_ignores_output_older_than_start() {
    let earlier = Instant::now();
    let start = earlier + SEC;
    let deadline = TimeoutStrategy::Progressive.deadline(start, Some(earlier), 10 * SEC);
    assert_eq!(deadline, start + 10 * SEC);
}

#[test]
fn test_default_is_progressive() {
    assert_eq!(TimeoutStrategy::default(), TimeoutStrategy::Progressive);
}
