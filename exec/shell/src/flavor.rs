//! Shell flavors and their per-flavor capabilities.
//!
//! Everything the marker engine needs to know about a shell family lives
//! here as data on [`ShellFlavor`]: how a command is wrapped so the shell
//! reports its exit status, how stdin is attached, how to verify the shell
//! responds, and how to recognize its syntax errors. The engine itself is
//! flavor-agnostic.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::ShellError;
use crate::escape::quote_cmd;
use crate::escape::quote_posix;
use crate::escape::quote_powershell;
use crate::escape::single_quote_posix;
use crate::shell_types::ShellType;

/// Delimiter for the here-document that carries stdin for POSIX shells.
pub const STDIN_DELIMITER: &str = "__SHELLKIT_EOF__";

#[allow(clippy::expect_used)]
static POSIX_SYNTAX_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?im)^.*(syntax error|unexpected EOF while looking for matching|unexpected end of file|bad substitution|parse error|unterminated quoted string|unmatched ["'`]).*$"#,
    )
    .expect("posix syntax error regex is valid")
});

#[allow(clippy::expect_used)]
static CMD_SYNTAX_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^.*(The syntax of the command is incorrect|was unexpected at this time).*$")
        .expect("cmd syntax error regex is valid")
});

#[allow(clippy::expect_used)]
static POWERSHELL_SYNTAX_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^.*(ParserError|ParseException|missing the terminator|Unexpected token|Missing closing|Missing expression|Incomplete string token).*$",
    )
    .expect("powershell syntax error regex is valid")
});

/// A family of shells that share one command-wrapping protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShellFlavor {
    /// bash, sh or zsh.
    #[serde(rename = "bash", alias = "posix", alias = "sh", alias = "zsh")]
    Posix,
    /// The Windows command shell.
    #[serde(rename = "cmd")]
    Cmd,
    #[serde(rename = "powershell", alias = "pwsh")]
    PowerShell,
}

impl ShellFlavor {
    pub const ALL: [ShellFlavor; 3] = [ShellFlavor::Posix, ShellFlavor::Cmd, ShellFlavor::PowerShell];

    /// Short name used in shell names and messages.
    pub fn name(self) -> &'static str {
        match self {
            ShellFlavor::Posix => "bash",
            ShellFlavor::Cmd => "cmd",
            ShellFlavor::PowerShell => "powershell",
        }
    }

    /// POSIX shell on Unix-likes, the command shell on Windows.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            ShellFlavor::Cmd
        } else {
            ShellFlavor::Posix
        }
    }

    /// Concrete shells to try, most preferred first.
    pub fn candidates(self) -> &'static [ShellType] {
        match self {
            ShellFlavor::Posix => &[ShellType::Bash, ShellType::Sh, ShellType::Zsh],
            ShellFlavor::Cmd => &[ShellType::Cmd],
            ShellFlavor::PowerShell => &[ShellType::PowerShell],
        }
    }

    /// Rewrites `command` so that, after it runs, the shell prints a line of
    /// the form `<marker><exit status>` on stdout.
    ///
    /// `stdin`, when given, is fed to the command from a here-document
    /// (POSIX) or a pipeline (PowerShell).
    pub fn wrap_command(self, command: &str, stdin: Option<&str>, marker: &str) -> Result<String> {
        match self {
            ShellFlavor::Posix => Ok(wrap_posix(command, stdin, marker)),
            ShellFlavor::Cmd => {
                if stdin.is_some() {
                    return Err(ShellError::Unsupported(
                        "stdin input is not supported for the cmd shell".to_string(),
                    ));
                }
                Ok(format!("{command}\n@echo.\n@echo {marker}%errorlevel%\n"))
            }
            ShellFlavor::PowerShell => Ok(wrap_powershell(command, stdin, marker)),
        }
    }

    /// A trivial command that must exit 0 on a healthy shell.
    pub fn verification_command(self) -> &'static str {
        match self {
            ShellFlavor::Posix => "true",
            ShellFlavor::Cmd => "ver >nul",
            ShellFlavor::PowerShell => "$null = $true",
        }
    }

    pub fn exit_command(self) -> &'static str {
        "exit"
    }

    pub fn cd_command(self, dir: &Path) -> String {
        let dir = dir.to_string_lossy();
        match self {
            ShellFlavor::Posix => format!("cd -- {}", quote_posix(&dir)),
            ShellFlavor::Cmd => format!("cd /d {}", quote_cmd(&dir)),
            ShellFlavor::PowerShell => format!("Set-Location -LiteralPath {}", quote_powershell(&dir)),
        }
    }

    /// Command that sets an environment variable for the rest of the
    /// session. `key` must already be validated.
    pub fn set_env_command(self, key: &str, value: &str) -> String {
        match self {
            ShellFlavor::Posix => format!("export {key}={}", quote_posix(value)),
            ShellFlavor::Cmd => format!("set \"{key}={value}\""),
            ShellFlavor::PowerShell => format!("${{env:{key}}} = {}", quote_powershell(value)),
        }
    }

    /// Returns the first line of `stderr` that reads like a syntax error
    /// from this flavor's interpreter.
    pub fn detect_syntax_error(self, stderr: &str) -> Option<String> {
        let pattern = match self {
            ShellFlavor::Posix => &*POSIX_SYNTAX_ERROR,
            ShellFlavor::Cmd => &*CMD_SYNTAX_ERROR,
            ShellFlavor::PowerShell => &*POWERSHELL_SYNTAX_ERROR,
        };
        pattern
            .find(stderr)
            .map(|m| m.as_str().trim().to_string())
            .filter(|line| !line.is_empty())
    }
}

impl fmt::Display for ShellFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShellFlavor {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bash" | "sh" | "zsh" | "posix" => Ok(ShellFlavor::Posix),
            "cmd" | "cmd.exe" => Ok(ShellFlavor::Cmd),
            "powershell" | "pwsh" => Ok(ShellFlavor::PowerShell),
            other => Err(ShellError::Config(format!("unknown shell flavor: {other}"))),
        }
    }
}

/// `command eval` keeps a syntax error in the user's text from being
/// treated as a fatal special-builtin error, and `< /dev/null` stops the
/// command from reading the shell's own input stream.
fn wrap_posix(command: &str, stdin: Option<&str>, marker: &str) -> String {
    let mut script = command.to_string();
    if let Some(input) = stdin {
        // The redirect must share a line with the command it feeds.
        script.truncate(script.trim_end().len());
        script.push_str(&format!(" <<'{STDIN_DELIMITER}'\n{input}"));
        if !input.ends_with('\n') {
            script.push('\n');
        }
        script.push_str(STDIN_DELIMITER);
    }
    format!(
        "command eval {} < /dev/null; __shellkit_status=$?; printf '\\n%s%s\\n' '{marker}' \"$__shellkit_status\"\n",
        single_quote_posix(&script)
    )
}

/// The script travels base64-encoded so the wrapped form is always a single
/// line regardless of quotes or newlines in the command. A failed statement
/// that leaves `$LASTEXITCODE` at 0 is reported as 1.
fn wrap_powershell(command: &str, stdin: Option<&str>, marker: &str) -> String {
    let script = match stdin {
        Some(input) => format!("{} | {command}", quote_powershell(input)),
        None => command.to_string(),
    };
    let encoded = BASE64_STANDARD.encode(script.as_bytes());
    format!(
        "$global:LASTEXITCODE = 0; $__shellkit_ok = $true; \
         try {{ Invoke-Expression ([System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String('{encoded}'))); $__shellkit_ok = $? }} \
         catch {{ $__shellkit_ok = $false; Write-Error $_ }} \
         finally {{ $__shellkit_code = $global:LASTEXITCODE; \
         if ($null -eq $__shellkit_code) {{ $__shellkit_code = 0 }}; \
         if (-not $__shellkit_ok -and $__shellkit_code -eq 0) {{ $__shellkit_code = 1 }}; \
         [Console]::Out.WriteLine(); [Console]::Out.WriteLine('{marker}' + $__shellkit_code) }}\n"
    )
}

#[cfg(test)]
#[path = "flavor.test.rs"]
mod tests;
