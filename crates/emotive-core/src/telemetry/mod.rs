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

//! Provides the data types and contracts for engine telemetry.
//!
//! This module defines the "common language" between the hot path, which
//! produces [`PerformanceSample`]s, and the degradation controller, which
//! consumes them. `emotive-telemetry` provides the concrete monitors and the
//! sampler that assembles samples from frame timings.

pub mod monitoring;
pub mod sample;

pub use self::monitoring::{FixedMemoryProbe, MemoryProbe};
pub use self::sample::PerformanceSample;
