//! sysinfo-backed snapshot collection.

use chrono::Utc;
use sysinfo::{Disks, ProcessesToUpdate, System};

use engram_core::metrics::{CpuMetrics, DiskMetrics, MemoryMetrics, ProcessMetrics};
use engram_core::ResourceMetrics;

/// Stateful collector; keeps one `System` so cpu deltas accumulate.
pub struct Collector {
    system: System,
    simple_mode: bool,
}

impl Collector {
    pub fn new(simple_mode: bool) -> Self {
        Self {
            system: System::new(),
            simple_mode,
        }
    }

    /// Take one snapshot. Nonsensical counters are repaired so that
    /// `used + free == total` and utilizations stay in [0, 1].
    pub fn sample(&mut self) -> ResourceMetrics {
        self.system.refresh_memory();

        let memory = MemoryMetrics::sanitized(self.system.total_memory(), self.system.used_memory());
        let load = System::load_average();

        let cpu_utilization = if self.simple_mode {
            // Lightweight path: approximate from the 1-minute load average.
            let cores = self.system.cpus().len().max(1);
            (load.one / cores as f64).clamp(0.0, 1.0)
        } else {
            self.system.refresh_cpu_usage();
            (self.system.global_cpu_usage() as f64 / 100.0).clamp(0.0, 1.0)
        };
        let cores = self.system.cpus().len().max(1);

        let cpu = CpuMetrics {
            cores,
            utilization: cpu_utilization,
            load_avg: [load.one, load.five, load.fifteen],
        };

        let process = self.sample_process();
        let disk = if self.simple_mode {
            None
        } else {
            sample_disk()
        };

        ResourceMetrics {
            timestamp: Utc::now(),
            memory,
            cpu,
            process,
            disk,
        }
    }

    fn sample_process(&mut self) -> ProcessMetrics {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(_) => {
                return ProcessMetrics {
                    pid: std::process::id(),
                    rss: 0,
                    heap_used: 0,
                    heap_total: 0,
                    uptime_secs: 0,
                }
            }
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        match self.system.process(pid) {
            Some(process) => ProcessMetrics {
                pid: std::process::id(),
                rss: process.memory(),
                heap_used: process.memory(),
                heap_total: process.virtual_memory(),
                uptime_secs: process.run_time(),
            },
            None => ProcessMetrics {
                pid: std::process::id(),
                rss: 0,
                heap_used: 0,
                heap_total: 0,
                uptime_secs: 0,
            },
        }
    }
}

fn sample_disk() -> Option<DiskMetrics> {
    let disks = Disks::new_with_refreshed_list();
    let mut total = 0u64;
    let mut free = 0u64;
    for disk in disks.list() {
        total += disk.total_space();
        free += disk.available_space();
    }
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(free);
    Some(DiskMetrics {
        total,
        used,
        free,
        utilization: (used as f64 / total as f64).clamp(0.0, 1.0),
    })
}
