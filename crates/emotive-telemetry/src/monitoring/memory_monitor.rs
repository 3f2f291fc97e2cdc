// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process memory monitor.
//!
//! Reads the resident set size of the current process through `sysinfo`.

use anyhow::anyhow;
use emotive_core::telemetry::MemoryProbe;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Resident memory of the current process.
#[derive(Debug)]
pub struct MemoryMonitor {
    system: System,
    pid: Pid,
    peak_mb: Option<f32>,
    sample_count: u64,
}

impl MemoryMonitor {
    /// Creates a monitor for the current process.
    pub fn new() -> anyhow::Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| anyhow!("cannot determine current process id: {e}"))?;
        Ok(Self {
            system: System::new(),
            pid,
            peak_mb: None,
            sample_count: 0,
        })
    }

    /// Refreshes and returns the resident memory in megabytes.
    pub fn sample(&mut self) -> Option<f32> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let bytes = self.system.process(self.pid)?.memory();
        let mb = (bytes as f64 / BYTES_PER_MB) as f32;
        self.sample_count += 1;
        self.peak_mb = Some(self.peak_mb.map_or(mb, |peak| peak.max(mb)));
        log::trace!("Process memory: {mb:.1}MB");
        Some(mb)
    }

    /// Resets the peak to the next reading.
    pub fn reset_peak_usage(&mut self) {
        self.peak_mb = None;
    }

    /// Readings taken so far.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}

impl MemoryProbe for MemoryMonitor {
    fn memory_usage_mb(&mut self) -> Option<f32> {
        self.sample()
    }

    fn peak_usage_mb(&self) -> Option<f32> {
        self.peak_mb
    }
}
