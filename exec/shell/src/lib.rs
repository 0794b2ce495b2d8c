//! Persistent interactive shells for shellkit.
//!
//! A [`PersistentShell`] turns a raw interactive shell process into a
//! request/response channel: every command is wrapped so the shell prints a
//! random completion marker followed by the exit status, and the engine waits
//! for that line instead of guessing when output has ended. State such as the
//! working directory and exported variables survives between commands.
//!
//! ```no_run
//! use shellkit_shell::PersistentShellBuilder;
//! use shellkit_shell::ShellFlavor;
//!
//! # async fn example() -> Result<(), shellkit_shell::ShellError> {
//! let shell = PersistentShellBuilder::new()
//!     .flavor(ShellFlavor::Posix)
//!     .build()?;
//! shell.execute("cd /tmp && export GREETING=hi").await;
//! let result = shell.execute("echo $GREETING from $(pwd)").await;
//! assert_eq!(result.stdout, "hi from /tmp\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Named shells
//!
//! [`ShellManager`] keeps many shells under unique names, refuses to run two
//! commands in one shell at the same time, and evicts shells that timed out
//! or went idle:
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use shellkit_shell::ShellFlavor;
//! use shellkit_shell::ShellManager;
//!
//! # async fn example() -> Result<(), shellkit_shell::ShellError> {
//! let manager = Arc::new(ShellManager::new());
//! manager.start_idle_cleanup();
//! let name = manager
//!     .create_shell(ShellFlavor::Posix, Some("build".to_string()), None, BTreeMap::new())
//!     .await?;
//! let result = manager
//!     .execute_in_shell(&name, "make -j8", Some(Duration::from_secs(600)), None)
//!     .await;
//! println!("{}", result.merged);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod escape;
pub mod flavor;
pub mod marker;
pub mod persistent;
pub mod registry;
pub mod resource;
pub mod session;
pub mod shell_types;

pub use builder::{DEFAULT_POLL_INTERVAL, DEFAULT_VERIFICATION_TIMEOUT, PersistentShellBuilder};
pub use config::{ManagerConfig, ShellConfig, default_config_path};
pub use error::{Result, ShellError};
pub use escape::{escape_for, join_args, quote_cmd, quote_posix, quote_powershell, split_args};
pub use flavor::ShellFlavor;
pub use marker::{AbortKind, TIMEOUT_CLASSIFICATION_WINDOW, classify_abort};
pub use persistent::{GRACEFUL_EXIT_TIMEOUT, PersistentShell, ShellCommand};
pub use registry::{PromotionOutcome, ShellCommandInfo, ShellInfo, ShellManager, ShellState};
pub use resource::{
    NoopResourceMonitor, ResourceLimits, ResourceMonitor, ResourceUsage, SysinfoResourceMonitor,
};
pub use session::{ShellSession, TIMEOUT_RESET_MESSAGE};
pub use shell_types::{Shell, ShellType, default_shell_for, default_user_shell, get_shell};

pub use shellkit_process::{CommandResult, CompletionState, FailureKind, TimeoutStrategy};
