//! Process enumeration collaborator.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Point-in-time metadata for one running process.
///
/// Opaque pass-through for the relay: produced on the sending side and
/// persisted verbatim on the receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process name.
    pub name: String,
    /// Scheduler status (running, sleeping, ...).
    pub status: String,
    /// Creation time, seconds since the Unix epoch.
    pub created: f64,
}

/// A snapshot of running processes keyed by pid (as a string).
pub type ProcessMap = HashMap<String, ProcessInfo>;

/// Source of process snapshots.
pub trait ProcessSource: Send + Sync {
    /// Enumerate the host's running processes.
    fn snapshot(&self) -> ProcessMap;
}

/// [`ProcessSource`] backed by the live system process table.
pub struct SystemProcessSource {
    system: Mutex<System>,
}

impl SystemProcessSource {
    /// Create a new source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SystemProcessSource {
    fn snapshot(&self) -> ProcessMap {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();
        system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let info = ProcessInfo {
                    name: process.name().to_string(),
                    status: process.status().to_string(),
                    created: process.start_time() as f64,
                };
                (pid.as_u32().to_string(), info)
            })
            .collect()
    }
}
