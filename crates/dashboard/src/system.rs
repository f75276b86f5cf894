//! Host CPU and memory load

use sysinfo::System;

/// One load sample, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemStats {
    pub cpu_percent: f32,
    pub ram_percent: f32,
}

impl SystemStats {
    /// Used share of total memory; 0 when the total is unknown
    pub fn ram_percent(used: u64, total: u64) -> f32 {
        if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64 * 100.0) as f32
        }
    }
}

/// Samples host load. CPU usage is measured since the previous sample, so the
/// first one reads 0.
pub struct SystemMonitor {
    system: System,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    pub fn sample(&mut self) -> SystemStats {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        SystemStats {
            cpu_percent: self.system.global_cpu_info().cpu_usage(),
            ram_percent: SystemStats::ram_percent(self.system.used_memory(), self.system.total_memory()),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}
