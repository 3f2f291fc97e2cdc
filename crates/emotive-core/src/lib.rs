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

//! # Emotive Core
//!
//! Foundational crate containing the contracts, plain data types, and event
//! primitives shared by every layer of the engine: the scheduler, the particle
//! lanes, and the degradation controller.
//!
//! Nothing in this crate owns per-frame state. Higher-level crates build on
//! these types and are wired together explicitly by `emotive-sdk`.

#![warn(missing_docs)]

pub mod clock;
pub mod control;
pub mod error;
pub mod event;
pub mod math;
pub mod renderer;
pub mod telemetry;

pub use clock::{Clock, ManualClock, MonotonicClock, Stopwatch};
pub use control::{DegradationLevel, DegradationTarget, Feature, FeatureSet};
pub use error::{ContractError, ContractResult};
pub use event::EventBus;
