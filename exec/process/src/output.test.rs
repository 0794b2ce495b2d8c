use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_decoder_splits_complete_lines() {
    let mut decoder = LineDecoder::default();
    let decoded = decoder.push(b"one\r\ntwo\nthr");
    assert_eq!(decoded.text, "one\r\ntwo\nthr");
    assert_eq!(decoded.lines, vec!["one".to_string(), "two".to_string()]);

    let decoded = decoder.push(b"ee\n");
    assert_eq!(decoded.lines, vec!["three".to_string()]);
}

#[test]
fn test_decoder_holds_split_multibyte_char() {
    let mut decoder = LineDecoder::default();
    let bytes = "héllo\n".as_bytes();
    // 'é' is two bytes; split between them.
    let first = decoder.push(&bytes[..2]);
    assert_eq!(first.text, "h");
    let second = decoder.push(&bytes[2..]);
    assert_eq!(second.text, "éllo\n");
    assert_eq!(second.lines, vec!["héllo".to_string()]);
}

#[test]
fn test_decoder_replaces_invalid_bytes() {
    let mut decoder = LineDecoder::default();
    let decoded = decoder.push(b"a\xffb\n");
    assert_eq!(decoded.text, "a\u{FFFD}b\n");
}

#[test]
fn test_decoder_finish_flushes_partial_line() {
    let mut decoder = LineDecoder::default();
    decoder.push(b"no newline");
    let decoded = decoder.finish();
    assert_eq!(decoded.text, "");
    assert_eq!(decoded.lines, vec!["no newline".to_string()]);
}

#[test]
fn test_decoder_finish_replaces_truncated_char() {
    let mut decoder = LineDecoder::default();
    decoder.push(&"é".as_bytes()[..1]);
    let decoded = decoder.finish();
    assert_eq!(decoded.text, "\u{FFFD}");
    assert_eq!(decoded.lines, vec!["\u{FFFD}".to_string()]);
}

#[test]
fn test_buffers_merge_in_arrival_order() {
    let buffers = OutputBuffers::default();
    buffers.append(OutputStream::Stdout, "out1\n");
    buffers.append(OutputStream::Stderr, "err1\n");
    buffers.append(OutputStream::Stdout, "out2\n");

    let snapshot = buffers.snapshot();
    assert_eq!(snapshot.stdout, "out1\nout2\n");
    assert_eq!(snapshot.stderr, "err1\n");
    assert_eq!(snapshot.merged, "out1\nerr1\nout2\n");
    assert!(buffers.last_output_at().is_some());
}

#[test]
fn test_buffers_clear_keeps_timestamp() {
    let buffers = OutputBuffers::default();
    buffers.append(OutputStream::Stdout, "x");
    buffers.clear();
    assert_eq!(buffers.stdout(), "");
    assert_eq!(buffers.stderr(), "");
    assert_eq!(buffers.merged(), "");
    assert!(buffers.last_output_at().is_some());
}

#[test]
fn test_buffers_take_snapshot_drains() {
    let buffers = OutputBuffers::default();
    buffers.append(OutputStream::Stdout, "before\n");
    buffers.append(OutputStream::Stderr, "warn\n");

    let taken = buffers.take_snapshot();
    assert_eq!(taken.stdout, "before\n");
    assert_eq!(taken.stderr, "warn\n");
    assert_eq!(taken.merged, "before\nwarn\n");

    buffers.append(OutputStream::Stdout, "after\n");
    assert_eq!(buffers.stdout(), "after\n");
    assert_eq!(buffers.merged(), "after\n");
    assert!(buffers.take_snapshot().stdout.contains("after"));
    assert_eq!(buffers.snapshot(), CapturedOutput::default());
}

#[test]
fn test_buffers_ignore_empty_append() {
    let buffers = OutputBuffers::default();
    buffers.append(OutputStream::Stdout, "");
    assert_eq!(buffers.last_output_at(), None);
}
