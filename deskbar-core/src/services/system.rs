//! CPU and memory gauges from `/proc`
//!
//! CPU usage is the busy share of jiffies between two `/proc/stat` reads, so
//! the first poll reports 0%.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use crate::error::{BackendError, BackendResult};
use crate::observable::Property;

/// Aggregate CPU counters from the `cpu` line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSnapshot {
    /// Sum of all states
    pub total: u64,
    /// Idle plus iowait
    pub idle: u64,
}

impl CpuSnapshot {
    /// Busy percentage since `previous`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_since(&self, previous: &Self) -> f64 {
        let total = self.total.saturating_sub(previous.total);
        if total == 0 {
            return 0.0;
        }
        let idle = self.idle.saturating_sub(previous.idle);
        (total.saturating_sub(idle) as f64 / total as f64) * 100.0
    }
}

/// Memory totals from `/proc/meminfo`, in KiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    /// `MemTotal`
    pub total_kib: u64,
    /// `MemAvailable`
    pub available_kib: u64,
}

impl MemorySnapshot {
    /// Used share of total memory
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used_percent(&self) -> f64 {
        if self.total_kib == 0 {
            return 0.0;
        }
        let used = self.total_kib.saturating_sub(self.available_kib);
        used as f64 / self.total_kib as f64 * 100.0
    }
}

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";

/// Parses the aggregate `cpu` line.
///
/// Format: `cpu  user nice system idle iowait irq softirq steal ...`
///
/// # Errors
///
/// Returns [`BackendError::Parse`] if the line is missing or too short.
pub fn parse_cpu_snapshot(content: &str) -> BackendResult<CpuSnapshot> {
    let parse_error = || BackendError::Parse {
        command: PROC_STAT,
        output: content.lines().next().unwrap_or_default().to_string(),
    };
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(parse_error)?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    if values.len() < 8 {
        return Err(parse_error());
    }

    Ok(CpuSnapshot {
        total: values.iter().sum(),
        idle: values[3] + values[4],
    })
}

/// Parses `MemTotal` and `MemAvailable`
///
/// # Errors
///
/// Returns [`BackendError::Parse`] if `MemTotal` is absent.
pub fn parse_meminfo(content: &str) -> BackendResult<MemorySnapshot> {
    let kib = |rest: &str| -> u64 {
        rest.split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };

    let mut snapshot = MemorySnapshot::default();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            snapshot.total_kib = kib(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            snapshot.available_kib = kib(rest);
        }
    }

    if snapshot.total_kib == 0 {
        return Err(BackendError::Parse {
            command: PROC_MEMINFO,
            output: "MemTotal not found".to_string(),
        });
    }
    Ok(snapshot)
}

/// Polled CPU and memory percentages
#[derive(Debug)]
pub struct SystemInfoService {
    proc_root: PathBuf,
    previous_cpu: Cell<Option<CpuSnapshot>>,
    /// CPU busy percentage over the last poll interval
    pub cpu_percent: Property<f64>,
    /// Used memory percentage
    pub memory_percent: Property<f64>,
}

impl Default for SystemInfoService {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl SystemInfoService {
    /// Reads `stat` and `meminfo` under `proc_root`
    #[must_use]
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            previous_cpu: Cell::new(None),
            cpu_percent: Property::new(0.0),
            memory_percent: Property::new(0.0),
        }
    }

    /// Takes one sample
    pub fn poll(&self) {
        match self.read_cpu() {
            Ok(cpu) => {
                let percent = self
                    .previous_cpu
                    .get()
                    .map_or(0.0, |prev| cpu.percent_since(&prev));
                self.previous_cpu.set(Some(cpu));
                self.cpu_percent.set(percent);
            }
            Err(e) => tracing::debug!(%e, "CPU sample failed"),
        }
        match self.read_memory() {
            Ok(memory) => {
                self.memory_percent.set(memory.used_percent());
            }
            Err(e) => tracing::debug!(%e, "Memory sample failed"),
        }
    }

    fn read_cpu(&self) -> BackendResult<CpuSnapshot> {
        parse_cpu_snapshot(&self.read("stat", PROC_STAT)?)
    }

    fn read_memory(&self) -> BackendResult<MemorySnapshot> {
        parse_meminfo(&self.read("meminfo", PROC_MEMINFO)?)
    }

    fn read(&self, file: &str, label: &'static str) -> BackendResult<String> {
        fs::read_to_string(self.proc_root.join(file)).map_err(|e| BackendError::Spawn {
            command: label,
            reason: e.to_string(),
        })
    }
}
