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

//! Traits for actively polled resources.
//!
//! A monitor is polled by the engine's performance-report step; it never
//! pushes data on its own.

use std::fmt::Debug;

/// A source of process memory readings.
pub trait MemoryProbe: Debug {
    /// Returns the current memory usage in megabytes, or `None` when the
    /// platform cannot provide it.
    fn memory_usage_mb(&mut self) -> Option<f32>;

    /// The highest reading observed so far, if tracked.
    fn peak_usage_mb(&self) -> Option<f32> {
        None
    }
}

/// A probe that always reports the same value.
///
/// Useful for deterministic headless runs and for hosts that have no memory
/// introspection at all (`FixedMemoryProbe(None)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMemoryProbe(pub Option<f32>);

impl MemoryProbe for FixedMemoryProbe {
    fn memory_usage_mb(&mut self) -> Option<f32> {
        self.0
    }

    fn peak_usage_mb(&self) -> Option<f32> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_probe_reports_constant() {
        let mut probe = FixedMemoryProbe(Some(64.0));
        assert_eq!(probe.memory_usage_mb(), Some(64.0));
        assert_eq!(probe.memory_usage_mb(), Some(64.0));
        assert_eq!(probe.peak_usage_mb(), Some(64.0));
        assert_eq!(FixedMemoryProbe::default().memory_usage_mb(), None);
    }
}
