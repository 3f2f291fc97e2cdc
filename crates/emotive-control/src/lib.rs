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

//! # Emotive Control
//!
//! The degradation controller: it watches performance samples, walks the
//! level ladder with hysteresis, and pushes the resulting limits to every
//! registered [`DegradationTarget`](emotive_core::DegradationTarget).

#![warn(missing_docs)]

pub mod analysis;
pub mod capability;
pub mod config;
pub mod events;
pub mod levels;
pub mod manager;
pub mod metrics;

pub use capability::CapabilityStatus;
pub use config::DegradationConfig;
pub use events::DegradationEvent;
pub use levels::{default_levels, LevelSelector, LevelTable};
pub use manager::{CheckResult, DegradationManager, DegradationStatus, TargetHandle, Transition};
