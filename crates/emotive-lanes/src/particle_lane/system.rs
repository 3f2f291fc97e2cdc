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

//! Owner of the pool and the live particle set.

use super::behavior::SimulationContext;
use super::particle::{Particle, SpawnParams};
use super::pool::{ParticlePool, PoolConfig, PoolStats};
use crate::render_lane::{GestureTransform, ParticleRenderer, RenderStats};
use emotive_core::control::{DegradationLevel, DegradationTarget, FeatureSet};
use emotive_core::math::Rgba;
use emotive_core::renderer::{DrawSurface, Viewport};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Particle system sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSystemConfig {
    /// Live particle ceiling at startup.
    pub max_particles: usize,
    /// Pool sizing.
    pub pool: PoolConfig,
    /// Visible area.
    pub viewport: Viewport,
}

impl Default for ParticleSystemConfig {
    fn default() -> Self {
        Self {
            max_particles: 50,
            pool: PoolConfig::default(),
            viewport: Viewport::default(),
        }
    }
}

/// Snapshot of the system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticleSystemStats {
    /// Live particles.
    pub live: usize,
    /// Effective live ceiling.
    pub max_particles: usize,
    /// Pool counters.
    pub pool: PoolStats,
}

/// What one simulation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepStats {
    /// Particles still alive after the step.
    pub alive: usize,
    /// Particles that died and went back to the pool.
    pub expired: usize,
    /// Live particles returned early because the ceiling was lowered.
    pub trimmed: usize,
}

/// The live particle set plus the pool that feeds it.
///
/// A new ceiling set through [`set_max_particles`](Self::set_max_particles)
/// takes effect at the start of the next [`update`](Self::update), never in
/// the middle of one.
#[derive(Debug)]
pub struct ParticleSystem {
    pool: ParticlePool,
    live: Vec<Particle>,
    scratch: Vec<Particle>,
    max_particles: usize,
    pending_max: Option<usize>,
    capacity: usize,
    emit_carry: f32,
}

impl ParticleSystem {
    /// Creates an empty system.
    pub fn new(config: &ParticleSystemConfig) -> Self {
        Self {
            pool: ParticlePool::from_config(&config.pool),
            live: Vec::with_capacity(config.max_particles),
            scratch: Vec::with_capacity(config.max_particles),
            max_particles: config.max_particles,
            pending_max: None,
            capacity: config.max_particles,
            emit_carry: 0.0,
        }
    }

    /// Spawns up to `count` particles without exceeding the ceiling. Returns
    /// how many were spawned.
    pub fn spawn<R: Rng + ?Sized>(&mut self, count: usize, params: &SpawnParams, rng: &mut R) -> usize {
        let room = self.max_particles.saturating_sub(self.live.len());
        let n = count.min(room);
        for _ in 0..n {
            let particle = self.pool.get_particle(params, rng);
            self.live.push(particle);
        }
        n
    }

    /// Continuous emission at `rate_per_sec`. Fractional particles carry over
    /// to the next call.
    pub fn emit<R: Rng + ?Sized>(
        &mut self,
        rate_per_sec: f32,
        dt_ms: f32,
        params: &SpawnParams,
        rng: &mut R,
    ) -> usize {
        if !rate_per_sec.is_finite() || rate_per_sec <= 0.0 || !dt_ms.is_finite() || dt_ms <= 0.0 {
            return 0;
        }
        self.emit_carry += rate_per_sec * dt_ms / 1000.0;
        let whole = self.emit_carry.floor();
        self.emit_carry -= whole;
        self.spawn(whole as usize, params, rng)
    }

    /// Advances every live particle. Dead particles go back to the pool, then
    /// the live set is trimmed (oldest first) to the current ceiling.
    pub fn update(&mut self, dt_ms: f32, ctx: &SimulationContext) -> StepStats {
        if let Some(max) = self.pending_max.take() {
            self.max_particles = max;
        }

        let mut stats = StepStats::default();
        std::mem::swap(&mut self.live, &mut self.scratch);
        for mut particle in self.scratch.drain(..) {
            if particle.update(dt_ms, ctx) {
                self.live.push(particle);
            } else {
                self.pool.return_particle(particle);
                stats.expired += 1;
            }
        }

        let excess = self.live.len().saturating_sub(self.max_particles);
        if excess > 0 {
            for particle in self.live.drain(..excess) {
                self.pool.return_particle(particle);
            }
            stats.trimmed = excess;
            log::debug!("Trimmed {excess} particles to ceiling {}", self.max_particles);
        }

        stats.alive = self.live.len();
        stats
    }

    /// Draws the live set.
    pub fn render(
        &mut self,
        surface: &mut dyn DrawSurface,
        renderer: &ParticleRenderer,
        fallback: Rgba,
        gesture: Option<&GestureTransform>,
    ) -> RenderStats {
        if renderer.options().glow {
            for particle in &mut self.live {
                particle.prepare_render_cache();
            }
        }
        renderer.render(surface, &self.live, fallback, gesture)
    }

    /// Requests a new live ceiling for the next step.
    pub fn set_max_particles(&mut self, max_particles: usize) {
        self.pending_max = Some(max_particles);
    }

    /// Returns every live particle to the pool.
    pub fn clear(&mut self) {
        for particle in self.live.drain(..) {
            self.pool.return_particle(particle);
        }
        self.emit_carry = 0.0;
    }

    /// Current snapshot.
    pub fn stats(&self) -> ParticleSystemStats {
        ParticleSystemStats {
            live: self.live.len(),
            max_particles: self.max_particles,
            pool: self.pool.stats(),
        }
    }

    /// Live particle count.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// The ceiling in effect for the current step.
    pub fn max_particles(&self) -> usize {
        self.pending_max.unwrap_or(self.max_particles)
    }

    /// Live particles, oldest first.
    pub fn particles(&self) -> &[Particle] {
        &self.live
    }

    /// Mutable access to live particles, for gesture overrides.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.live
    }

    /// The backing pool.
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Mutable access to the backing pool.
    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut self.pool
    }
}

impl DegradationTarget for ParticleSystem {
    fn target_name(&self) -> &str {
        "particles"
    }

    /// Level limits only lower the ceiling below the configured capacity.
    fn apply_level(&mut self, level: &DegradationLevel, _available: &FeatureSet) {
        let limit = level.particle_limit.min(self.capacity);
        log::info!(
            "Particle ceiling {} -> {} ({})",
            self.max_particles(),
            limit,
            level.name
        );
        self.set_max_particles(limit);
    }
}
