//! Process Memory Sampling
//!
//! Supplies the coarse whole-process memory signal used by memory-pressure
//! sweeps. The reading covers every allocation in the process, not just
//! cached entries.

use std::sync::Mutex;

use sysinfo::{Pid, System};
use tracing::warn;

/// Source of process memory readings, in bytes.
///
/// `None` means the sample could not be taken; the sweep skips its
/// memory-pressure phase for that cycle.
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> Option<u64>;
}

// == Process Memory Sampler ==
/// Resident memory of the current process, read through `sysinfo`.
pub struct ProcessMemorySampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Cannot resolve current pid, memory sampling disabled: {}", e);
                None
            }
        };

        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessMemorySampler {
    fn sample(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|p| p.memory())
    }
}

impl std::fmt::Debug for ProcessMemorySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMemorySampler")
            .field("pid", &self.pid)
            .finish()
    }
}
