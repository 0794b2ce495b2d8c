//! shellkit CLI - run commands through persistent shells.
//!
//! `run` executes one command in a fresh shell, `exec` feeds commands read
//! from stdin to one named shell, and `session` is an interactive loop over a
//! shell whose state carries across lines.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

use shellkit_shell::CommandResult;
use shellkit_shell::CompletionState;
use shellkit_shell::PersistentShellBuilder;
use shellkit_shell::ShellCommand;
use shellkit_shell::ShellConfig;
use shellkit_shell::ShellFlavor;
use shellkit_shell::ShellManager;
use shellkit_shell::ShellSession;
use shellkit_shell::SysinfoResourceMonitor;
use shellkit_shell::default_config_path;
use shellkit_utils_common::format_millis;
use shellkit_utils_common::init_logging;

/// Conventional exit status for a command killed by a timeout.
const TIMEOUT_EXIT_STATUS: u8 = 124;
const CANCELED_EXIT_STATUS: u8 = 130;

#[derive(Parser)]
#[command(name = "shellkit")]
#[command(about = "Run commands in persistent shells")]
struct Cli {
    /// Path to config file (default: ~/.shellkit/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single command in a fresh shell
    Run {
        command: String,
        /// Shell flavor: bash, cmd or powershell
        #[arg(short, long)]
        shell: Option<ShellFlavor>,
        /// Command timeout, e.g. "30s" or "2m"
        #[arg(short, long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },

    /// Run newline-separated commands from stdin in one named shell
    Exec {
        #[arg(short, long)]
        shell: Option<ShellFlavor>,
        /// Name of the shell to create
        #[arg(short, long)]
        name: Option<String>,
        /// Working directory for the shell
        #[arg(short = 'C', long)]
        dir: Option<PathBuf>,
        #[arg(short, long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },

    /// Interactive session; `exit` ends it
    Session {
        #[arg(short, long)]
        shell: Option<ShellFlavor>,
        #[arg(short, long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.logging);

    let flavor_or_default = |shell: Option<ShellFlavor>| {
        shell
            .or(config.default_flavor)
            .unwrap_or_else(ShellFlavor::platform_default)
    };

    match cli.command {
        Command::Run {
            command,
            shell,
            timeout,
        } => run_once(&config, flavor_or_default(shell), &command, timeout).await,
        Command::Exec {
            shell,
            name,
            dir,
            timeout,
        } => {
            let flavor = flavor_or_default(shell);
            exec_from_stdin(config, flavor, name, dir, timeout).await
        }
        Command::Session { shell, timeout } => {
            let flavor = flavor_or_default(shell);
            run_session(config, flavor, timeout).await
        }
    }
}

fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<ShellConfig> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            ShellConfig::load(path)?
        }
        None => match default_config_path() {
            Some(path) => ShellConfig::load(&path)?,
            None => ShellConfig::default(),
        },
    };
    config
        .apply_env_overrides()
        .context("invalid SHELLKIT_* environment override")?;
    Ok(config)
}

async fn run_once(
    config: &ShellConfig,
    flavor: ShellFlavor,
    command: &str,
    timeout: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    let mut request = ShellCommand::new(command);
    if let Some(timeout) = timeout {
        request = request.with_timeout(timeout);
    }
    let result = PersistentShellBuilder::from_config(config)
        .flavor(flavor)
        .run_with(request)
        .await?;
    print!("{}", result.stdout);
    eprint!("{}", result.stderr);
    report_failure(&result);
    Ok(exit_code_for(&result))
}

async fn exec_from_stdin(
    config: ShellConfig,
    flavor: ShellFlavor,
    name: Option<String>,
    dir: Option<PathBuf>,
    timeout: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    let manager = Arc::new(ShellManager::with_config(
        config,
        Arc::new(SysinfoResourceMonitor::new()),
    ));
    manager.start_idle_cleanup();
    let name = manager
        .create_shell(flavor, name, dir, BTreeMap::new())
        .await?;
    tracing::info!(%name, "Reading commands from stdin");

    let mut exit = ExitCode::SUCCESS;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let result = manager.execute_in_shell(&name, line, timeout, None).await;
        print!("{}", result.merged);
        std::io::stdout().flush()?;
        report_failure(&result);
        exit = exit_code_for(&result);
        if manager.shell_info(&name).is_none() {
            tracing::warn!(%name, "Shell is gone; stopping");
            break;
        }
    }

    if let Some(usage) = manager.resource_usage(&name) {
        tracing::debug!(
            memory_bytes = usage.memory_bytes,
            cpu_percent = usage.cpu_percent,
            "Final shell resource usage"
        );
    }
    manager.shutdown_all();
    Ok(exit)
}

async fn run_session(
    config: ShellConfig,
    flavor: ShellFlavor,
    timeout: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    let session = ShellSession::with_config(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{flavor}> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let output = session.run(flavor, line, timeout).await;
        println!("{}", output.trim_end_matches('\n'));
        if line == "exit" {
            break;
        }
    }
    session.close();
    Ok(ExitCode::SUCCESS)
}

fn report_failure(result: &CommandResult) {
    if result.state == CompletionState::Completed && result.diagnostic.is_none() {
        return;
    }
    if let Some(message) = result.failure_message() {
        eprintln!("shellkit: {message} ({})", format_millis(result.duration_ms));
    }
}

fn exit_code_for(result: &CommandResult) -> ExitCode {
    match result.state {
        CompletionState::Completed => ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1)),
        CompletionState::TimedOut => ExitCode::from(TIMEOUT_EXIT_STATUS),
        CompletionState::Canceled => ExitCode::from(CANCELED_EXIT_STATUS),
        CompletionState::Error => ExitCode::FAILURE,
    }
}
