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

//! Sample classification for the degradation controller.
//!
//! The `PerformanceAnalyzer` looks at one incoming sample against the current
//! level and the rolling history, and reports whether the reading is poor,
//! good, or neither. It also flags memory pressure and steady memory growth.

use crate::config::DegradationConfig;
use crate::metrics::PerformanceWindow;
use emotive_core::control::DegradationLevel;
use emotive_core::telemetry::PerformanceSample;
use serde::Serialize;

/// How a single sample reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Below the poor threshold, or under memory pressure.
    Poor,
    /// Comfortably at target.
    Good,
    /// Between the two thresholds.
    Neutral,
}

/// Findings for one sample.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The classification.
    pub verdict: Verdict,
    /// Memory usage is above the threshold.
    pub memory_pressure: bool,
    /// The memory window shows a sustained climb; `Some(growth_mb)`.
    pub leak_growth_mb: Option<f32>,
    /// Human-readable notes for logging.
    pub alerts: Vec<String>,
}

/// Classifies samples against configured thresholds.
#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    poor_fps_ratio: f32,
    good_fps_ratio: f32,
    memory_threshold_mb: f32,
    leak_growth_mb: f32,
    leak_detection: bool,
}

impl PerformanceAnalyzer {
    /// Reads thresholds from `config`.
    pub fn new(config: &DegradationConfig) -> Self {
        Self {
            poor_fps_ratio: config.poor_fps_ratio,
            good_fps_ratio: config.good_fps_ratio,
            memory_threshold_mb: config.memory_threshold_mb,
            leak_growth_mb: config.leak_growth_mb,
            leak_detection: config.leak_detection,
        }
    }

    /// Analyzes `sample`, which must already be in `window`.
    pub fn analyze(
        &self,
        sample: &PerformanceSample,
        level: &DegradationLevel,
        window: &PerformanceWindow,
    ) -> AnalysisReport {
        let mut report = AnalysisReport {
            verdict: Verdict::Neutral,
            memory_pressure: false,
            leak_growth_mb: None,
            alerts: Vec::new(),
        };

        // ── Frame rate ──
        let poor_below = level.target_fps * self.poor_fps_ratio;
        let good_from = level.target_fps * self.good_fps_ratio;
        if sample.fps < poor_below {
            log::debug!(
                "Analyzer: fps {:.1} below {:.1} at '{}'",
                sample.fps,
                poor_below,
                level.name
            );
            report.verdict = Verdict::Poor;
            report.alerts.push(format!(
                "FPS: {:.1} below poor threshold {:.1}.",
                sample.fps, poor_below
            ));
        } else if sample.fps >= good_from {
            report.verdict = Verdict::Good;
        }

        // ── Memory pressure ──
        if let Some(mb) = sample.memory_usage_mb {
            if mb > self.memory_threshold_mb {
                log::warn!(
                    "Analyzer: memory {:.1}MB above {:.1}MB",
                    mb,
                    self.memory_threshold_mb
                );
                report.memory_pressure = true;
                report.verdict = Verdict::Poor;
                report.alerts.push(format!(
                    "Memory: {:.1}MB exceeds {:.0}MB.",
                    mb, self.memory_threshold_mb
                ));
            }
        }

        // ── Leak detection ──
        let memory = &window.memory_mb;
        if self.leak_detection && memory.is_full() && memory.is_non_decreasing() {
            let growth = memory.growth();
            if growth > self.leak_growth_mb {
                report.leak_growth_mb = Some(growth);
                report.alerts.push(format!(
                    "Memory: grew {:.1}MB over {} samples without release.",
                    growth,
                    memory.count()
                ));
            }
        }

        report
    }
}
