use std::sync::Mutex;

use serde::Serialize;
use sysinfo::System;

/// Load of the machine running the service (not of the reporting clients).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStats {
    pub server_cpu_usage: f32,
    pub server_memory_usage: f32,
    pub server_uptime_minutes: u64,
    pub server_status: &'static str,
}

pub struct SystemMonitor {
    system: Mutex<System>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first reading has a baseline
        system.refresh_cpu_usage();
        system.refresh_memory();
        SystemMonitor {
            system: Mutex::new(system),
        }
    }

    /// CPU usage is measured since the previous call.
    pub fn snapshot(&self) -> ServerStats {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_cpu_usage();
        system.refresh_memory();

        ServerStats {
            server_cpu_usage: system.global_cpu_usage(),
            server_memory_usage: memory_usage_percent(system.used_memory(), system.total_memory()),
            server_uptime_minutes: System::uptime() / 60,
            server_status: "Stable",
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn memory_usage_percent(used_bytes: u64, total_bytes: u64) -> f32 {
    if total_bytes == 0 {
        return 0.0;
    }
    let percent = used_bytes as f64 / total_bytes as f64 * 100.0;
    ((percent * 10.0).round() / 10.0) as f32
}
