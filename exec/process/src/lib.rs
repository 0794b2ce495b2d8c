//! Native process supervision for shellkit.
//!
//! [`ProcessHandle`] owns one OS process and captures its output into
//! append-only buffers while it runs. It is the primitive under the
//! persistent shells in `shellkit-shell`, and can also be used directly for
//! one-shot commands:
//!
//! ```no_run
//! use shellkit_process::ProcessBuilder;
//! use shellkit_process::ProcessCallbacks;
//!
//! # async fn example() -> Result<(), shellkit_process::ProcessError> {
//! let callbacks = ProcessCallbacks::new().on_stdout(|line| println!("> {line}"));
//! let result = ProcessBuilder::new("cargo")
//!     .arg("build")
//!     .callbacks(callbacks)
//!     .run()
//!     .await?;
//! assert!(result.success());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod callbacks;
pub mod error;
pub mod handle;
mod output;
pub mod result;
pub mod timeout;
pub mod verbosity;

pub use builder::{DEFAULT_TIMEOUT, ProcessBuilder, is_valid_env_key};
pub use callbacks::{EventCallback, LineCallback, OutputStream, ProcessCallbacks, ProcessEvent};
pub use error::{ProcessError, Result};
pub use handle::{OUTPUT_LOG_TARGET, ProcessHandle, ProcessState};
pub use result::{CapturedOutput, CommandResult, CompletionState, FailureKind};
pub use timeout::{PROGRESSIVE_CAP_FACTOR, TimeoutStrategy};
pub use verbosity::{ConsoleVerbosity, VerbosityFlag};
