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

//! Degradation targets owned by the engine itself.

use emotive_core::control::{DegradationLevel, DegradationTarget, Feature, FeatureSet};

/// Forwards each level's target frame rate to the scheduler.
///
/// The scheduler cannot be borrowed while a tick runs, so the relay only
/// records the new rate; the performance-report callback drains it through
/// its frame context.
#[derive(Debug, Clone)]
pub struct TargetFpsRelay {
    ceiling: f32,
    forwarded: f32,
    pending: Option<f32>,
}

impl TargetFpsRelay {
    /// A relay that never raises the rate above `ceiling`, the configured
    /// scheduler target.
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling,
            forwarded: ceiling,
            pending: None,
        }
    }

    /// Takes the rate waiting to be applied.
    pub fn take_pending(&mut self) -> Option<f32> {
        self.pending.take()
    }

    /// Last rate handed to the scheduler, or the ceiling.
    pub fn forwarded(&self) -> f32 {
        self.forwarded
    }
}

impl DegradationTarget for TargetFpsRelay {
    fn target_name(&self) -> &str {
        "scheduler"
    }

    fn apply_level(&mut self, level: &DegradationLevel, _available: &FeatureSet) {
        let fps = level.target_fps.min(self.ceiling);
        if fps != self.forwarded {
            self.forwarded = fps;
            self.pending = Some(fps);
        }
    }
}

/// Stand-in for the audio collaborator: tracks whether audio may run.
#[derive(Debug, Clone)]
pub struct AudioGate {
    enabled: bool,
    changes: u32,
}

impl AudioGate {
    /// An open gate.
    pub fn new() -> Self {
        Self {
            enabled: true,
            changes: 0,
        }
    }

    /// Whether audio may run.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Times the gate flipped.
    pub fn changes(&self) -> u32 {
        self.changes
    }
}

impl Default for AudioGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DegradationTarget for AudioGate {
    fn target_name(&self) -> &str {
        "audio"
    }

    fn apply_level(&mut self, level: &DegradationLevel, available: &FeatureSet) {
        let enabled = available.contains(Feature::Audio);
        if enabled != self.enabled {
            log::info!(
                "Audio {} at level '{}'",
                if enabled { "enabled" } else { "disabled" },
                level.name
            );
            self.enabled = enabled;
            self.changes += 1;
        }
    }
}
