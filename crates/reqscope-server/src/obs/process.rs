//! Default process metrics, aggregated next to the request metrics.
//!
//! Values come from `sysinfo`, refreshed for the current pid on every scrape.
//! Where a value is unavailable the family is still announced (HELP/TYPE) but
//! carries no sample.

use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use reqscope_core::metrics::{Collector, Desc, MetricKind};

/// One reading of the current process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSample {
    pub cpu_seconds: Option<f64>,
    pub start_time_secs: Option<u64>,
    pub resident_bytes: Option<u64>,
}

pub struct ProcessCollector {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "current pid unavailable, process metrics disabled");
                None
            }
        };
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }

    fn families() -> [Desc; 3] {
        [
            Desc::new(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
                MetricKind::Counter,
            ),
            Desc::new(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                MetricKind::Gauge,
            ),
            Desc::new(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                MetricKind::Gauge,
            ),
        ]
    }

    /// Refresh and read the current process.
    pub fn sample(&self) -> ProcessSample {
        let Some(pid) = self.pid else {
            return ProcessSample::default();
        };
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        match system.process(pid) {
            Some(p) => ProcessSample {
                cpu_seconds: Some(p.accumulated_cpu_time() as f64 / 1000.0),
                start_time_secs: Some(p.start_time()).filter(|t| *t > 0),
                resident_bytes: Some(p.memory()),
            },
            None => ProcessSample::default(),
        }
    }
}

impl Collector for ProcessCollector {
    fn descs(&self) -> Vec<Desc> {
        Self::families().to_vec()
    }

    fn encode(&self, out: &mut String) {
        encode_sample(&self.sample(), out);
    }
}

fn encode_sample(sample: &ProcessSample, out: &mut String) {
    let values: [Option<String>; 3] = [
        sample.cpu_seconds.map(|v| v.to_string()),
        sample.start_time_secs.map(|v| v.to_string()),
        sample.resident_bytes.map(|v| v.to_string()),
    ];

    for (desc, value) in ProcessCollector::families().iter().zip(values) {
        desc.encode_header(out);
        if let Some(v) = value {
            let _ = writeln!(out, "{} {}", desc.name, v);
        }
    }
}
