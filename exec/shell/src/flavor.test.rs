use super::*;
use pretty_assertions::assert_eq;

const MARKER: &str = "__SHELLKIT_MARK_test__";

#[test]
fn test_names_and_parsing() {
    for flavor in ShellFlavor::ALL {
        assert_eq!(flavor.name().parse::<ShellFlavor>().expect("parse"), flavor);
    }
    assert_eq!("zsh".parse::<ShellFlavor>().expect("parse"), ShellFlavor::Posix);
    assert_eq!("PWSH".parse::<ShellFlavor>().expect("parse"), ShellFlavor::PowerShell);
    assert!("fish".parse::<ShellFlavor>().is_err());
}

#[test]
fn test_platform_default() {
    if cfg!(windows) {
        assert_eq!(ShellFlavor::platform_default(), ShellFlavor::Cmd);
    } else {
        assert_eq!(ShellFlavor::platform_default(), ShellFlavor::Posix);
    }
}

#[test]
fn test_wrap_posix() {
    let wrapped = ShellFlavor::Posix
        .wrap_command("echo 'hi'", None, MARKER)
        .expect("wrap");
    assert_eq!(
        wrapped,
        "command eval 'echo '\\''hi'\\''' < /dev/null; __shellkit_status=$?; \
         printf '\\n%s%s\\n' '__SHELLKIT_MARK_test__' \"$__shellkit_status\"\n"
    );
}

#[test]
fn test_wrap_posix_with_stdin_uses_quoted_heredoc() {
    let wrapped = ShellFlavor::Posix
        .wrap_command("cat", Some("line one\n$HOME"), MARKER)
        .expect("wrap");
    assert!(wrapped.starts_with(
        "command eval 'cat <<'\\''__SHELLKIT_EOF__'\\''\nline one\n$HOME\n__SHELLKIT_EOF__'"
    ));
}

#[test]
fn test_wrap_posix_heredoc_follows_command_with_trailing_newline() {
    let wrapped = ShellFlavor::Posix
        .wrap_command("cat \n\n", Some("hello"), MARKER)
        .expect("wrap");
    assert!(wrapped.starts_with(
        "command eval 'cat <<'\\''__SHELLKIT_EOF__'\\''\nhello\n__SHELLKIT_EOF__'"
    ));
}

#[test]
fn test_wrap_cmd() {
    let wrapped = ShellFlavor::Cmd.wrap_command("dir", None, MARKER).expect("wrap");
    assert_eq!(wrapped, "dir\n@echo.\n@echo __SHELLKIT_MARK_test__%errorlevel%\n");
}

#[test]
fn test_wrap_cmd_rejects_stdin() {
    let err = ShellFlavor::Cmd
        .wrap_command("sort", Some("b\na"), MARKER)
        .expect_err("cmd has no stdin support");
    assert!(matches!(err, ShellError::Unsupported(_)));
}

#[test]
fn test_wrap_powershell_is_single_line() {
    let wrapped = ShellFlavor::PowerShell
        .wrap_command("Write-Output 'a'\nWrite-Output \"b\"", Some("x"), MARKER)
        .expect("wrap");
    assert_eq!(wrapped.matches('\n').count(), 1);
    assert!(wrapped.ends_with('\n'));
    assert!(wrapped.contains("$global:LASTEXITCODE = 0"));
    assert!(wrapped.contains("'__SHELLKIT_MARK_test__' + $__shellkit_code"));

    let encoded = BASE64_STANDARD.encode("'x' | Write-Output 'a'\nWrite-Output \"b\"".as_bytes());
    assert!(wrapped.contains(&encoded));
}

#[test]
fn test_setup_commands() {
    let dir = Path::new("/tmp/my dir");
    assert_eq!(ShellFlavor::Posix.cd_command(dir), "cd -- '/tmp/my dir'");
    assert_eq!(ShellFlavor::Cmd.cd_command(dir), "cd /d \"/tmp/my dir\"");
    assert_eq!(
        ShellFlavor::PowerShell.cd_command(dir),
        "Set-Location -LiteralPath '/tmp/my dir'"
    );

    assert_eq!(ShellFlavor::Posix.set_env_command("FOO", "a b"), "export FOO='a b'");
    assert_eq!(ShellFlavor::Cmd.set_env_command("FOO", "a b"), "set \"FOO=a b\"");
    assert_eq!(
        ShellFlavor::PowerShell.set_env_command("FOO", "it's"),
        "${env:FOO} = 'it''s'"
    );
}

#[test]
fn test_detect_posix_syntax_errors() {
    let bash = "bash: eval: line 1: unexpected EOF while looking for matching `\"'\n";
    assert_eq!(
        ShellFlavor::Posix.detect_syntax_error(bash).as_deref(),
        Some("bash: eval: line 1: unexpected EOF while looking for matching `\"'")
    );
    let dash = "sh: 1: eval: Syntax error: Unterminated quoted string";
    assert!(ShellFlavor::Posix.detect_syntax_error(dash).is_some());
    assert_eq!(
        ShellFlavor::Posix.detect_syntax_error("ls: cannot access 'x': No such file"),
        None
    );
}

#[test]
fn test_detect_cmd_and_powershell_syntax_errors() {
    assert!(
        ShellFlavor::Cmd
            .detect_syntax_error("The syntax of the command is incorrect.")
            .is_some()
    );
    assert!(
        ShellFlavor::Cmd
            .detect_syntax_error(") was unexpected at this time.")
            .is_some()
    );
    assert!(
        ShellFlavor::PowerShell
            .detect_syntax_error("The string is missing the terminator: \".")
            .is_some()
    );
    assert_eq!(ShellFlavor::PowerShell.detect_syntax_error("Access denied"), None);
}

#[test]
fn test_serde_names() {
    let json = serde_json::to_string(&ShellFlavor::Posix).expect("serialize");
    assert_eq!(json, "\"bash\"");
    let parsed: ShellFlavor = serde_json::from_str("\"pwsh\"").expect("deserialize");
    assert_eq!(parsed, ShellFlavor::PowerShell);
}
