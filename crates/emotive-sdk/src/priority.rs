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

//! Priority tiers for scheduled work.

use emotive_core::error::ContractError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal class of a frame callback. Lower ordinals run first and are
/// shed last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Priority {
    /// Never skipped.
    Critical = 0,
    /// Simulation and drawing.
    High = 1,
    /// Secondary animation.
    Medium = 2,
    /// Skipped when the frame rate falls under the low floor.
    Low = 3,
    /// Skipped first.
    Idle = 4,
}

impl Priority {
    /// Every tier, in execution order.
    pub const ALL: [Priority; 5] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Idle,
    ];

    /// Tier name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Idle => "idle",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ContractError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(ContractError::InvalidPriority(value))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
