//! Resource bookkeeping for registry-managed shells.

use std::fmt;
use std::sync::Mutex as StdMutex;

use dashmap::DashMap;
use serde::Deserialize;
use serde::Serialize;
use sysinfo::Pid;
use sysinfo::ProcessRefreshKind;
use sysinfo::ProcessesToUpdate;
use sysinfo::System;

use crate::flavor::ShellFlavor;

/// Point-in-time usage of one shell process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub memory_bytes: u64,
    pub cpu_percent: f32,
    /// True when a recorded limit is currently exceeded.
    pub limit_exceeded: bool,
}

/// Limits are recorded and reported, not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_bytes: Option<u64>,
    pub max_cpu_percent: Option<f32>,
}

impl ResourceLimits {
    pub fn is_exceeded_by(&self, memory_bytes: u64, cpu_percent: f32) -> bool {
        self.max_memory_bytes.is_some_and(|max| memory_bytes > max)
            || self.max_cpu_percent.is_some_and(|max| cpu_percent > max)
    }
}

/// Tracks the processes behind named shells.
pub trait ResourceMonitor: Send + Sync + fmt::Debug {
    fn register(&self, pid: u32, name: &str, flavor: ShellFlavor);

    fn unregister(&self, name: &str);

    fn usage(&self, name: &str) -> Option<ResourceUsage>;

    /// Returns false when `name` is not registered.
    fn set_limits(&self, name: &str, limits: ResourceLimits) -> bool;
}

/// Monitor that tracks nothing.
#[derive(Debug, Default)]
pub struct NoopResourceMonitor;

impl ResourceMonitor for NoopResourceMonitor {
    fn register(&self, _pid: u32, _name: &str, _flavor: ShellFlavor) {}

    fn unregister(&self, _name: &str) {}

    fn usage(&self, _name: &str) -> Option<ResourceUsage> {
        None
    }

    fn set_limits(&self, _name: &str, _limits: ResourceLimits) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    pid: u32,
    flavor: ShellFlavor,
    limits: ResourceLimits,
}

/// Samples memory and CPU through `sysinfo`.
///
/// CPU usage is measured between two refreshes, so the first sample for a
/// process reads 0.
#[derive(Default)]
pub struct SysinfoResourceMonitor {
    system: StdMutex<System>,
    tracked: DashMap<String, Tracked>,
}

impl SysinfoResourceMonitor {
    pub fn new() -> Self {
        Self {
            system: StdMutex::new(System::new()),
            tracked: DashMap::new(),
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

impl fmt::Debug for SysinfoResourceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysinfoResourceMonitor")
            .field("tracked", &self.tracked.len())
            .finish()
    }
}

impl ResourceMonitor for SysinfoResourceMonitor {
    fn register(&self, pid: u32, name: &str, flavor: ShellFlavor) {
        tracing::debug!(pid, name, %flavor, "Monitoring shell");
        self.tracked.insert(
            name.to_string(),
            Tracked {
                pid,
                flavor,
                limits: ResourceLimits::default(),
            },
        );
    }

    fn unregister(&self, name: &str) {
        if let Some((_, tracked)) = self.tracked.remove(name) {
            tracing::debug!(pid = tracked.pid, name, flavor = %tracked.flavor, "Stopped monitoring shell");
        }
    }

    fn usage(&self, name: &str) -> Option<ResourceUsage> {
        let tracked = *self.tracked.get(name)?;
        let pid = Pid::from_u32(tracked.pid);
        let mut system = self
            .system
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let refresh = ProcessRefreshKind::nothing().with_memory().with_cpu();
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);
        let process = system.process(pid)?;
        let memory_bytes = process.memory();
        let cpu_percent = process.cpu_usage();
        Some(ResourceUsage {
            memory_bytes,
            cpu_percent,
            limit_exceeded: tracked.limits.is_exceeded_by(memory_bytes, cpu_percent),
        })
    }

    fn set_limits(&self, name: &str, limits: ResourceLimits) -> bool {
        match self.tracked.get_mut(name) {
            Some(mut tracked) => {
                tracked.limits = limits;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "resource.test.rs"]
mod tests;
