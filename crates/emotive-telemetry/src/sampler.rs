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

//! Interval-based performance sampling.
//!
//! The sampler is fed one frame delta per tick and emits a
//! [`PerformanceSample`] once per configured interval, averaging the frame
//! rate over that interval and attaching a memory reading when a probe is
//! installed.

use emotive_core::telemetry::{MemoryProbe, PerformanceSample};
use serde::{Deserialize, Serialize};

/// Sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Milliseconds of frame time accumulated per sample.
    pub sample_interval_ms: f64,
    /// Attach a memory reading to each sample.
    pub track_memory: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000.0,
            track_memory: true,
        }
    }
}

/// Turns frame deltas into periodic samples.
#[derive(Debug)]
pub struct PerformanceSampler {
    interval_ms: f64,
    accumulated_ms: f64,
    frames: u32,
    probe: Option<Box<dyn MemoryProbe>>,
    last_sample: Option<PerformanceSample>,
    samples_emitted: u64,
}

impl PerformanceSampler {
    /// Creates a sampler. The probe is dropped when `track_memory` is off.
    pub fn new(config: &TelemetryConfig, probe: Option<Box<dyn MemoryProbe>>) -> Self {
        let interval_ms = if config.sample_interval_ms.is_finite() && config.sample_interval_ms > 0.0
        {
            config.sample_interval_ms
        } else {
            log::warn!(
                "Invalid sample interval {}, using default.",
                config.sample_interval_ms
            );
            TelemetryConfig::default().sample_interval_ms
        };
        Self {
            interval_ms,
            accumulated_ms: 0.0,
            frames: 0,
            probe: probe.filter(|_| config.track_memory),
            last_sample: None,
            samples_emitted: 0,
        }
    }

    /// Records one frame. Returns a sample when the interval has elapsed.
    pub fn record_frame(&mut self, delta_ms: f64) -> Option<PerformanceSample> {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            log::debug!("Sampler ignored frame delta {delta_ms}.");
            return None;
        }
        self.accumulated_ms += delta_ms;
        self.frames += 1;
        if self.accumulated_ms < self.interval_ms {
            return None;
        }

        let fps = if self.accumulated_ms > 0.0 {
            (f64::from(self.frames) * 1000.0 / self.accumulated_ms) as f32
        } else {
            0.0
        };
        let mut sample = PerformanceSample::new(fps);
        if let Some(mb) = self.probe.as_mut().and_then(|p| p.memory_usage_mb()) {
            sample = sample.with_memory(mb);
        }
        log::trace!(
            "Sample: {:.1} fps over {} frames ({:.0}ms)",
            fps,
            self.frames,
            self.accumulated_ms
        );

        self.accumulated_ms = 0.0;
        self.frames = 0;
        self.samples_emitted += 1;
        self.last_sample = Some(sample);
        Some(sample)
    }

    /// The most recent sample.
    pub fn last_sample(&self) -> Option<PerformanceSample> {
        self.last_sample
    }

    /// Samples produced so far.
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted
    }

    /// Interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Peak memory reported by the probe, if any.
    pub fn peak_memory_mb(&self) -> Option<f32> {
        self.probe.as_ref().and_then(|p| p.peak_usage_mb())
    }

    /// Drops the partial interval.
    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
        self.frames = 0;
    }
}
