//! Process-level measurements.
//!
//! The pool's memory ceiling and the monitor's self-sampling both read the
//! process through a [`ProcessProbe`], so tests can substitute a probe that
//! reports whatever they need.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// One reading of the current process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSample {
  /// Resident set size, in bytes.
  pub resident_bytes: u64,
  /// Virtual memory size, in bytes.
  pub virtual_bytes: u64,
  /// CPU usage since the previous reading, in percent of one core.
  pub cpu_percent: f32,
}

pub trait ProcessProbe: Send + Sync + fmt::Debug {
  fn sample(&self) -> ProcessSample;

  fn resident_bytes(&self) -> u64 {
    self.sample().resident_bytes
  }
}

/// Reads the current process through `sysinfo`.
///
/// CPU usage is a delta between refreshes, so the first sample reports 0.
pub struct SysinfoProbe {
  pid: Option<Pid>,
  system: Mutex<System>,
}

impl SysinfoProbe {
  pub fn new() -> Self {
    let pid = match sysinfo::get_current_pid() {
      Ok(pid) => Some(pid),
      Err(reason) => {
        tracing::warn!(reason, "cannot resolve current pid; process samples will read as zero");
        None
      }
    };
    Self {
      pid,
      system: Mutex::new(System::new()),
    }
  }
}

impl Default for SysinfoProbe {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for SysinfoProbe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SysinfoProbe").field("pid", &self.pid).finish()
  }
}

impl ProcessProbe for SysinfoProbe {
  fn sample(&self) -> ProcessSample {
    let Some(pid) = self.pid else {
      return ProcessSample::default();
    };
    let mut system = self.system.lock();
    system.refresh_process(pid);
    match system.process(pid) {
      Some(process) => ProcessSample {
        resident_bytes: process.memory(),
        virtual_bytes: process.virtual_memory(),
        cpu_percent: process.cpu_usage(),
      },
      None => ProcessSample::default(),
    }
  }
}

/// A probe that reports a settable resident size and nothing else.
#[derive(Debug, Default)]
pub struct FixedProbe {
  resident: AtomicU64,
}

impl FixedProbe {
  pub fn new(resident_bytes: u64) -> Self {
    Self {
      resident: AtomicU64::new(resident_bytes),
    }
  }

  pub fn set(&self, resident_bytes: u64) {
    self.resident.store(resident_bytes, Ordering::Relaxed);
  }
}

impl ProcessProbe for FixedProbe {
  fn sample(&self) -> ProcessSample {
    let resident_bytes = self.resident.load(Ordering::Relaxed);
    ProcessSample {
      resident_bytes,
      virtual_bytes: resident_bytes,
      cpu_percent: 0.0,
    }
  }
}
