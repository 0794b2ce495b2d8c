//! Output accumulation for a running process.

use std::sync::Mutex as StdMutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Instant;

use crate::callbacks::OutputStream;
use crate::result::CapturedOutput;

#[derive(Debug, Default)]
struct Buffers {
    stdout: String,
    stderr: String,
    merged: String,
    last_output_at: Option<Instant>,
}

/// Append-only text buffers shared between reader tasks and the handle.
#[derive(Debug, Default)]
pub(crate) struct OutputBuffers {
    inner: StdMutex<Buffers>,
}

impl OutputBuffers {
    pub(crate) fn append(&self, stream: OutputStream, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut buffers = self.lock();
        match stream {
            OutputStream::Stdout => buffers.stdout.push_str(text),
            OutputStream::Stderr => buffers.stderr.push_str(text),
        }
        buffers.merged.push_str(text);
        buffers.last_output_at = Some(Instant::now());
    }

    pub(crate) fn stdout(&self) -> String {
        self.lock().stdout.clone()
    }

    pub(crate) fn stderr(&self) -> String {
        self.lock().stderr.clone()
    }

    pub(crate) fn merged(&self) -> String {
        self.lock().merged.clone()
    }

    pub(crate) fn snapshot(&self) -> CapturedOutput {
        let buffers = self.lock();
        CapturedOutput {
            stdout: buffers.stdout.clone(),
            stderr: buffers.stderr.clone(),
            merged: buffers.merged.clone(),
        }
    }

    /// Returns everything buffered so far and empties the buffers in the
    /// same critical section.
    pub(crate) fn take_snapshot(&self) -> CapturedOutput {
        let mut buffers = self.lock();
        CapturedOutput {
            stdout: std::mem::take(&mut buffers.stdout),
            stderr: std::mem::take(&mut buffers.stderr),
            merged: std::mem::take(&mut buffers.merged),
        }
    }

    pub(crate) fn last_output_at(&self) -> Option<Instant> {
        self.lock().last_output_at
    }

    /// Empties the text buffers. The last-output timestamp is kept.
    pub(crate) fn clear(&self) {
        let mut buffers = self.lock();
        buffers.stdout.clear();
        buffers.stderr.clear();
        buffers.merged.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Text produced by one [`LineDecoder`] step.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Decoded {
    /// Everything decoded from the input, line terminators included.
    pub(crate) text: String,
    /// Lines completed by this step, without `\n` or a trailing `\r`.
    pub(crate) lines: Vec<String>,
}

/// Incremental UTF-8 decoder and line splitter for a byte stream.
///
/// Multi-byte characters split across reads are held back until complete.
/// Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    pending: Vec<u8>,
    partial_line: String,
}

impl LineDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Decoded {
        self.pending.extend_from_slice(bytes);
        let text = self.decode_pending(false);
        self.split_lines(text)
    }

    /// Flushes held-back bytes and any unterminated final line.
    pub(crate) fn finish(&mut self) -> Decoded {
        let text = self.decode_pending(true);
        let mut decoded = self.split_lines(text);
        if !self.partial_line.is_empty() {
            let line = std::mem::take(&mut self.partial_line);
            decoded.lines.push(trim_cr(&line).to_string());
        }
        decoded
    }

    fn decode_pending(&mut self, at_eof: bool) -> String {
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match err.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                        None if at_eof => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.clear();
                            return text;
                        }
                        None => {
                            self.pending.drain(..valid_up_to);
                            return text;
                        }
                    }
                }
            }
        }
    }

    fn split_lines(&mut self, text: String) -> Decoded {
        let mut lines = Vec::new();
        let mut rest = text.as_str();
        while let Some(idx) = rest.find('\n') {
            self.partial_line.push_str(&rest[..idx]);
            let line = std::mem::take(&mut self.partial_line);
            lines.push(trim_cr(&line).to_string());
            rest = &rest[idx + 1..];
        }
        self.partial_line.push_str(rest);
        Decoded { text, lines }
    }
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
#[path = "output.test.rs"]
mod tests;
