//! Source of the "echo subprocess output" switch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Answers whether subprocess output should be echoed to the log.
pub trait ConsoleVerbosity: Send + Sync + fmt::Debug {
    fn is_verbose(&self) -> bool;
}

/// Shared, toggleable verbosity switch.
#[derive(Debug, Clone, Default)]
pub struct VerbosityFlag(Arc<AtomicBool>);

impl VerbosityFlag {
    pub fn new(verbose: bool) -> Self {
        Self(Arc::new(AtomicBool::new(verbose)))
    }

    pub fn set(&self, verbose: bool) {
        self.0.store(verbose, Ordering::Relaxed);
    }
}

impl ConsoleVerbosity for VerbosityFlag {
    fn is_verbose(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
