use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_quote_posix_leaves_safe_words() {
    assert_eq!(quote_posix("ls"), "ls");
    assert_eq!(quote_posix("/usr/bin/env"), "/usr/bin/env");
    assert_eq!(quote_posix("KEY=value"), "KEY=value");
}

#[test]
fn test_quote_posix_quotes_unsafe_words() {
    assert_eq!(quote_posix(""), "''");
    assert_eq!(quote_posix("two words"), "'two words'");
    assert_eq!(quote_posix("$HOME"), "'$HOME'");
    assert_eq!(quote_posix("it's"), r"'it'\''s'");
}

#[test]
fn test_single_quote_posix_always_quotes() {
    assert_eq!(single_quote_posix("ls"), "'ls'");
}

#[test]
fn test_quote_cmd() {
    assert_eq!(quote_cmd("dir"), "dir");
    assert_eq!(quote_cmd("C:\\Program Files"), "\"C:\\Program Files\"");
    assert_eq!(quote_cmd("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(quote_cmd("a&b"), "\"a&b\"");
    assert_eq!(quote_cmd(""), "\"\"");
}

#[test]
fn test_quote_powershell() {
    assert_eq!(quote_powershell("Get-Item"), "'Get-Item'");
    assert_eq!(quote_powershell("it's"), "'it''s'");
    assert_eq!(quote_powershell("\u{2019}"), "'\u{2019}\u{2019}'");
    assert_eq!(quote_powershell("$env:PATH"), "'$env:PATH'");
}

#[test]
fn test_join_args_per_flavor() {
    let args = ["echo", "hello world"];
    assert_eq!(join_args(ShellFlavor::Posix, &args), "echo 'hello world'");
    assert_eq!(join_args(ShellFlavor::Cmd, &args), "echo \"hello world\"");
    assert_eq!(
        join_args(ShellFlavor::PowerShell, &args),
        "& 'echo' 'hello world'"
    );
}

#[test]
fn test_split_args() {
    assert_eq!(
        split_args("grep -n 'a b' file"),
        Some(vec![
            "grep".to_string(),
            "-n".to_string(),
            "a b".to_string(),
            "file".to_string()
        ])
    );
    assert_eq!(split_args("echo 'open"), None);
}

#[cfg(unix)]
#[test]
fn test_find_executable() {
    assert!(find_executable("sh").is_some());
    assert!(find_executable("shellkit-no-such-binary").is_none());
}
