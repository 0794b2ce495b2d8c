use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_detect_shell_type_simple() {
    assert_eq!(
        detect_shell_type(&PathBuf::from("zsh")),
        Some(ShellType::Zsh)
    );
    assert_eq!(
        detect_shell_type(&PathBuf::from("bash")),
        Some(ShellType::Bash)
    );
    assert_eq!(
        detect_shell_type(&PathBuf::from("pwsh")),
        Some(ShellType::PowerShell)
    );
    assert_eq!(detect_shell_type(&PathBuf::from("fish")), None);
}

#[test]
fn test_detect_shell_type_full_path_and_extension() {
    assert_eq!(
        detect_shell_type(&PathBuf::from("/bin/sh")),
        Some(ShellType::Sh)
    );
    assert_eq!(
        detect_shell_type(&PathBuf::from("/usr/local/bin/pwsh")),
        Some(ShellType::PowerShell)
    );
    assert_eq!(
        detect_shell_type(&PathBuf::from("powershell.exe")),
        Some(ShellType::PowerShell)
    );
    assert_eq!(
        detect_shell_type(&PathBuf::from("CMD.EXE")),
        Some(ShellType::Cmd)
    );
}

#[test]
fn test_flavor_mapping() {
    assert_eq!(ShellType::Zsh.flavor(), ShellFlavor::Posix);
    assert_eq!(ShellType::Bash.flavor(), ShellFlavor::Posix);
    assert_eq!(ShellType::Sh.flavor(), ShellFlavor::Posix);
    assert_eq!(ShellType::Cmd.flavor(), ShellFlavor::Cmd);
    assert_eq!(ShellType::PowerShell.flavor(), ShellFlavor::PowerShell);
}

#[test]
fn test_startup_args_skip_profiles() {
    let shell = Shell {
        shell_type: ShellType::Bash,
        shell_path: PathBuf::from("/bin/bash"),
    };
    assert_eq!(shell.startup_args(), vec!["--noprofile", "--norc"]);
    assert_eq!(shell.name(), "bash");
    assert!(ShellType::PowerShell.startup_args().contains(&"-NoProfile"));
    assert!(ShellType::Cmd.startup_args().contains(&"/D"));
}

#[cfg(unix)]
#[test]
fn test_default_shell_for_posix() {
    let shell = default_shell_for(ShellFlavor::Posix).expect("some posix shell");
    assert_eq!(shell.flavor(), ShellFlavor::Posix);
    assert!(shell.shell_path.is_file());
}

#[cfg(unix)]
#[test]
fn test_get_shell_by_path() {
    let shell = get_shell_by_path(Path::new("/bin/sh")).expect("resolve /bin/sh");
    assert_eq!(shell.shell_type, ShellType::Sh);
    assert_eq!(shell.shell_path, PathBuf::from("/bin/sh"));
    assert_eq!(get_shell_by_path(Path::new("/usr/bin/fish-not-real")), None);
}
