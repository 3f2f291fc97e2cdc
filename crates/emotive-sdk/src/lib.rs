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

//! # Emotive SDK
//!
//! The public entry point of the engine. It provides the cooperative frame
//! scheduler ([`AnimationLoopManager`]) and the [`Engine`] that wires the
//! particle lanes, the degradation controller, and telemetry together
//! through it.

#![warn(missing_docs)]

pub mod animation_loop;
pub mod config;
pub mod engine;
pub mod priority;
pub mod targets;

pub use animation_loop::{
    AnimationLoopManager, CallbackId, FrameCallback, FrameContext, FrameOutcome, LoopConfig,
    LoopEvent, LoopStats,
};
pub use config::{EmitterConfig, EngineConfig};
pub use engine::{Engine, EngineStats};
pub use priority::Priority;
pub use targets::{AudioGate, TargetFpsRelay};

/// Commonly used types, re-exported for applications.
pub mod prelude {
    pub use crate::{
        AnimationLoopManager, Engine, EngineConfig, FrameContext, FrameOutcome, Priority,
    };
    pub use emotive_core::math::{Rgba, Vec2};
    pub use emotive_core::renderer::{DrawSurface, RecordingSurface, Viewport};
    pub use emotive_core::telemetry::PerformanceSample;
    pub use emotive_lanes::{Behavior, GestureTransform, SpawnParams};
}
