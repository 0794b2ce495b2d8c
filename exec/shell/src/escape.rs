//! Argument quoting per shell flavor and executable lookup.

use std::borrow::Cow;
use std::path::PathBuf;

use crate::flavor::ShellFlavor;

/// Characters that never need quoting in a POSIX shell word.
fn is_posix_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | ',' | '=' | '+' | '@' | '%')
}

/// Quotes `value` as a single POSIX shell word.
///
/// Safe words are returned unchanged; everything else is single-quoted with
/// embedded `'` written as `'\''`.
pub fn quote_posix(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_posix_safe) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(single_quote_posix(value))
    }
}

/// Always single-quotes, even for safe words.
pub fn single_quote_posix(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quotes `value` for the Windows command shell.
///
/// Embedded double quotes are doubled. `%VAR%` references are still expanded
/// by the shell; there is no portable way to suppress that on a command line.
pub fn quote_cmd(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '&' | '|' | '<' | '>' | '^' | '(' | ')'));
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Quotes `value` as a PowerShell single-quoted string.
///
/// PowerShell also treats the typographic single quotes as delimiters, so
/// those are doubled along with `'`.
pub fn quote_powershell(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Quotes `value` for `flavor`.
pub fn escape_for(flavor: ShellFlavor, value: &str) -> String {
    match flavor {
        ShellFlavor::Posix => quote_posix(value).into_owned(),
        ShellFlavor::Cmd => quote_cmd(value).into_owned(),
        ShellFlavor::PowerShell => quote_powershell(value),
    }
}

/// Joins `args` into a single command line for `flavor`.
///
/// PowerShell treats a quoted first word as a string, so the line is
/// prefixed with the call operator.
pub fn join_args<S: AsRef<str>>(flavor: ShellFlavor, args: &[S]) -> String {
    let joined = args
        .iter()
        .map(|arg| escape_for(flavor, arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ");
    match flavor {
        ShellFlavor::PowerShell if !joined.is_empty() => format!("& {joined}"),
        _ => joined,
    }
}

/// Splits a POSIX-style argument string. Returns `None` on unbalanced quotes.
pub fn split_args(line: &str) -> Option<Vec<String>> {
    shlex::split(line)
}

/// Resolves `name` against `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
#[path = "escape.test.rs"]
mod tests;
