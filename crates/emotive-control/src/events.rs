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

//! Events published by the degradation controller.

use emotive_core::control::Feature;
use serde::Serialize;

/// Why a feature changed availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureChangeCause {
    /// A level change.
    Level,
    /// An explicit user toggle.
    User,
    /// Progressive enhancement.
    Enhancement,
}

/// A state change in the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DegradationEvent {
    /// The current level changed.
    LevelChanged {
        /// Previous level name.
        from: String,
        /// New level name.
        to: String,
        /// Short reason for logs.
        reason: String,
    },
    /// A feature became unavailable.
    FeatureDisabled {
        /// The feature.
        feature: Feature,
        /// What caused it.
        cause: FeatureChangeCause,
    },
    /// A feature became available.
    FeatureEnabled {
        /// The feature.
        feature: Feature,
        /// What caused it.
        cause: FeatureChangeCause,
    },
    /// Memory crossed the pressure threshold.
    MemoryPressure {
        /// Latest reading.
        usage_mb: f32,
        /// Configured threshold.
        threshold_mb: f32,
    },
    /// Memory grew steadily across the whole window.
    MemoryLeakDetected {
        /// Growth across the window.
        growth_mb: f32,
        /// Samples in the window.
        samples: usize,
    },
    /// Previously probed features were switched back on.
    ProgressiveEnhancementApplied {
        /// Features re-enabled.
        features: Vec<Feature>,
    },
    /// The controller returned to its initial state.
    Reset,
}

impl DegradationEvent {
    /// Short event name.
    pub fn name(&self) -> &'static str {
        match self {
            DegradationEvent::LevelChanged { .. } => "level_changed",
            DegradationEvent::FeatureDisabled { .. } => "feature_disabled",
            DegradationEvent::FeatureEnabled { .. } => "feature_enabled",
            DegradationEvent::MemoryPressure { .. } => "memory_pressure",
            DegradationEvent::MemoryLeakDetected { .. } => "memory_leak_detected",
            DegradationEvent::ProgressiveEnhancementApplied { .. } => {
                "progressive_enhancement_applied"
            }
            DegradationEvent::Reset => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_string(&DegradationEvent::FeatureDisabled {
            feature: Feature::Glow,
            cause: FeatureChangeCause::User,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"feature_disabled","feature":"glow","cause":"user"}"#
        );
        assert_eq!(DegradationEvent::Reset.name(), "reset");
    }
}
