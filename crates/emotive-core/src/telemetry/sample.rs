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

//! The performance reading fed to the degradation controller.

use crate::error::{ContractError, ContractResult};
use serde::{Deserialize, Serialize};

/// One observation of engine health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Frames per second measured over the sampling interval.
    pub fps: f32,
    /// Resident memory of the process in megabytes, when it can be measured.
    #[serde(default)]
    pub memory_usage_mb: Option<f32>,
}

impl PerformanceSample {
    /// A sample carrying only a frame rate.
    pub fn new(fps: f32) -> Self {
        Self {
            fps,
            memory_usage_mb: None,
        }
    }

    /// Attaches a memory reading.
    pub fn with_memory(mut self, memory_usage_mb: f32) -> Self {
        self.memory_usage_mb = Some(memory_usage_mb);
        self
    }

    /// Rejects readings that cannot come from a real measurement.
    pub fn validate(&self) -> ContractResult<()> {
        if !self.fps.is_finite() || self.fps < 0.0 {
            return Err(ContractError::InvalidSample(format!(
                "fps must be finite and non-negative, got {}",
                self.fps
            )));
        }
        if let Some(mb) = self.memory_usage_mb {
            if !mb.is_finite() || mb < 0.0 {
                return Err(ContractError::InvalidSample(format!(
                    "memory usage must be finite and non-negative, got {mb}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_real_readings() {
        assert!(PerformanceSample::new(60.0).validate().is_ok());
        assert!(PerformanceSample::new(0.0).with_memory(12.5).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        assert!(PerformanceSample::new(f32::NAN).validate().is_err());
        assert!(PerformanceSample::new(-1.0).validate().is_err());
        assert!(PerformanceSample::new(30.0)
            .with_memory(f32::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_memory_is_optional_when_deserializing() {
        let sample: PerformanceSample = serde_json::from_str(r#"{"fps": 42.0}"#).unwrap();
        assert_eq!(sample, PerformanceSample::new(42.0));
    }
}
