//! Concrete shell executables and how to find them.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::escape::find_executable;
use crate::flavor::ShellFlavor;

/// A concrete shell program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Zsh,
    Bash,
    Sh,
    PowerShell,
    Cmd,
}

impl ShellType {
    pub fn name(self) -> &'static str {
        match self {
            ShellType::Zsh => "zsh",
            ShellType::Bash => "bash",
            ShellType::Sh => "sh",
            ShellType::PowerShell => "powershell",
            ShellType::Cmd => "cmd",
        }
    }

    pub fn flavor(self) -> ShellFlavor {
        match self {
            ShellType::Zsh | ShellType::Bash | ShellType::Sh => ShellFlavor::Posix,
            ShellType::PowerShell => ShellFlavor::PowerShell,
            ShellType::Cmd => ShellFlavor::Cmd,
        }
    }

    /// Arguments that start the shell reading commands from stdin without
    /// loading user profiles, so no prompt or rc output interferes with the
    /// completion marker.
    pub fn startup_args(self) -> &'static [&'static str] {
        match self {
            ShellType::Bash => &["--noprofile", "--norc"],
            // POSIX_BUILTINS lets `command eval` reach the builtin.
            ShellType::Zsh => &["-f", "-o", "POSIX_BUILTINS"],
            ShellType::Sh => &[],
            ShellType::PowerShell => &["-NoLogo", "-NoProfile", "-NonInteractive", "-Command", "-"],
            ShellType::Cmd => &["/D", "/Q"],
        }
    }

    /// Executable names to look up on `PATH`, most preferred first.
    fn executable_names(self) -> &'static [&'static str] {
        match self {
            ShellType::Zsh => &["zsh"],
            ShellType::Bash => &["bash"],
            ShellType::Sh => &["sh"],
            ShellType::PowerShell => &["pwsh", "powershell"],
            ShellType::Cmd => &["cmd"],
        }
    }

    /// Well-known locations used when `PATH` lookup fails.
    fn fallback_paths(self) -> &'static [&'static str] {
        match self {
            ShellType::Zsh => &["/bin/zsh", "/usr/bin/zsh"],
            ShellType::Bash => &["/bin/bash", "/usr/bin/bash"],
            ShellType::Sh => &["/bin/sh"],
            ShellType::PowerShell | ShellType::Cmd => &[],
        }
    }
}

/// A resolved shell executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub shell_type: ShellType,
    pub shell_path: PathBuf,
}

impl Shell {
    pub fn name(&self) -> &'static str {
        self.shell_type.name()
    }

    pub fn flavor(&self) -> ShellFlavor {
        self.shell_type.flavor()
    }

    pub fn startup_args(&self) -> Vec<String> {
        self.shell_type
            .startup_args()
            .iter()
            .map(|arg| (*arg).to_string())
            .collect()
    }
}

/// Infers the shell type from an executable name or path.
pub fn detect_shell_type(shell_path: &Path) -> Option<ShellType> {
    let stem = shell_path.file_stem()?.to_str()?.to_ascii_lowercase();
    match stem.as_str() {
        "zsh" => Some(ShellType::Zsh),
        "bash" => Some(ShellType::Bash),
        "sh" | "dash" => Some(ShellType::Sh),
        "pwsh" | "powershell" => Some(ShellType::PowerShell),
        "cmd" => Some(ShellType::Cmd),
        _ => None,
    }
}

/// Resolves a shell of `shell_type`, preferring `path` when it exists.
pub fn get_shell(shell_type: ShellType, path: Option<&Path>) -> Option<Shell> {
    if let Some(path) = path
        && let Some(resolved) = resolve_path(path)
    {
        return Some(Shell {
            shell_type,
            shell_path: resolved,
        });
    }

    shell_type
        .executable_names()
        .iter()
        .find_map(|name| find_executable(name))
        .or_else(|| comspec_for(shell_type))
        .or_else(|| {
            shell_type
                .fallback_paths()
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_file())
        })
        .map(|shell_path| Shell {
            shell_type,
            shell_path,
        })
}

/// Resolves an explicit shell executable and infers its type.
pub fn get_shell_by_path(path: &Path) -> Option<Shell> {
    let shell_type = detect_shell_type(path)?;
    let shell_path = resolve_path(path)?;
    Some(Shell {
        shell_type,
        shell_path,
    })
}

/// First available shell of `flavor`.
pub fn default_shell_for(flavor: ShellFlavor) -> Option<Shell> {
    flavor
        .candidates()
        .iter()
        .find_map(|shell_type| get_shell(*shell_type, None))
}

/// The platform's default shell.
pub fn default_user_shell() -> Option<Shell> {
    default_shell_for(ShellFlavor::platform_default())
}

pub(crate) fn resolve_path(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    path.to_str().and_then(find_executable)
}

fn comspec_for(shell_type: ShellType) -> Option<PathBuf> {
    if shell_type != ShellType::Cmd {
        return None;
    }
    std::env::var_os("COMSPEC")
        .map(PathBuf::from)
        .filter(|path| path.is_file())
}

#[cfg(test)]
#[path = "shell_types.test.rs"]
mod tests;
