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

//! Tuning for the degradation controller.

use crate::levels::default_levels;
use emotive_core::control::DegradationLevel;
use serde::{Deserialize, Serialize};

/// Configuration for [`DegradationManager`](crate::DegradationManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// A sample below `target_fps * poor_fps_ratio` of the current level is
    /// poor.
    pub poor_fps_ratio: f32,
    /// A sample at or above `target_fps * good_fps_ratio` of the current level
    /// is good.
    pub good_fps_ratio: f32,
    /// Consecutive poor samples needed before moving down one level.
    pub poor_sample_threshold: u32,
    /// How long a scheduled recovery waits before it is applied.
    pub recovery_delay_ms: f64,
    /// Resident memory above which a sample is poor.
    pub memory_threshold_mb: f32,
    /// Minimum growth across a full, non-decreasing memory window that counts
    /// as a leak.
    pub leak_growth_mb: f32,
    /// Whether leak detection runs at all.
    pub leak_detection: bool,
    /// Samples kept in the fps window.
    pub fps_window: usize,
    /// Samples kept in the memory window.
    pub memory_window: usize,
    /// The ladder, least degraded first.
    pub levels: Vec<DegradationLevel>,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            poor_fps_ratio: 0.75,
            good_fps_ratio: 0.9,
            poor_sample_threshold: 5,
            recovery_delay_ms: 3000.0,
            memory_threshold_mb: 512.0,
            leak_growth_mb: 50.0,
            leak_detection: true,
            fps_window: 30,
            memory_window: 10,
            levels: default_levels(),
        }
    }
}
