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

//! Engine configuration.

use crate::animation_loop::LoopConfig;
use anyhow::Context;
use emotive_control::DegradationConfig;
use emotive_lanes::{Behavior, ParticleSystemConfig};
use emotive_telemetry::{LoggingConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Continuous particle emission at the viewport center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Particles per second; `0` disables emission.
    pub rate_per_sec: f32,
    /// Behavior of emitted particles.
    pub behavior: Behavior,
    /// Hex palette; `None` uses the fallback color.
    pub colors: Option<Vec<String>>,
    /// Emotion tag on emitted particles.
    pub emotion: String,
    /// Size multiplier.
    pub size_multiplier: f32,
    /// Lifetime multiplier.
    pub life_multiplier: f32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 12.0,
            behavior: Behavior::Ambient,
            colors: None,
            emotion: "neutral".to_string(),
            size_multiplier: 1.0,
            life_multiplier: 1.0,
        }
    }
}

/// Everything needed to build an [`Engine`](crate::Engine).
///
/// Every section is optional in JSON; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler tuning.
    pub scheduler: LoopConfig,
    /// Particle ceiling, pool, and viewport.
    pub particles: ParticleSystemConfig,
    /// Emission.
    pub emitter: EmitterConfig,
    /// Degradation thresholds and ladder.
    pub degradation: DegradationConfig,
    /// Sampling.
    pub telemetry: TelemetryConfig,
    /// Log filter.
    pub logging: LoggingConfig,
    /// Hex color for particles without a palette.
    pub fallback_color: String,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: LoopConfig::default(),
            particles: ParticleSystemConfig::default(),
            emitter: EmitterConfig::default(),
            degradation: DegradationConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
            fallback_color: "#ffffff".to_string(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine configuration")
    }

    /// Reads and parses a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Pretty JSON, for `--print-config` style output.
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize engine configuration")
    }
}
