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

//! # Emotive Lanes
//!
//! The per-frame hot path: particle behaviors, the particle pool, the
//! particle system that owns the live set, and the batched renderer.
//!
//! Everything here is single-threaded and allocation-averse. Limits (the
//! particle ceiling, optional draw paths) are set from outside through the
//! [`DegradationTarget`](emotive_core::DegradationTarget) contract and take
//! effect at the next step.

#![warn(missing_docs)]

pub mod particle_lane;
pub mod render_lane;

pub use particle_lane::{
    Behavior, Particle, ParticlePool, ParticleSystem, ParticleSystemConfig, ParticleSystemStats,
    PoolConfig, PoolStats, SimulationContext, SpawnParams, StepStats,
};
pub use render_lane::{GestureTransform, ParticleRenderer, RenderOptions, RenderStats};
