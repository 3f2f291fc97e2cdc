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

//! Bounded free list of reusable particles.

use super::particle::{Particle, SpawnParams};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of particles kept on the free list.
    pub pool_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { pool_size: 100 }
    }
}

/// Counters describing pool health.
///
/// `total_created` growing while `total_destroyed` stays flat means particles
/// are being issued and never handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    /// Free-list capacity.
    pub pool_size: usize,
    /// Requests satisfied from the free list.
    pub pool_hits: u64,
    /// Requests that had to construct a particle.
    pub pool_misses: u64,
    /// Particles ever constructed.
    pub total_created: u64,
    /// Particles discarded (returned at capacity or trimmed).
    pub total_destroyed: u64,
    /// Current free-list length.
    pub free: usize,
}

impl PoolStats {
    /// Fraction of requests served by reuse, `0.0` before the first request.
    pub fn efficiency(&self) -> f32 {
        let requests = self.pool_hits + self.pool_misses;
        if requests == 0 {
            0.0
        } else {
            self.pool_hits as f32 / requests as f32
        }
    }

    /// Particles issued and not yet returned.
    pub fn outstanding(&self) -> u64 {
        self.total_created
            .saturating_sub(self.total_destroyed)
            .saturating_sub(self.free as u64)
    }
}

/// What happened to a particle handed back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// Joined the free list.
    Pooled,
    /// The free list was full; the particle was dropped and counted.
    Destroyed,
    /// The particle was issued before the last [`ParticlePool::clear`]; it
    /// was dropped without touching the counters.
    Stale,
}

/// An object pool for [`Particle`]s.
///
/// Conservation holds at every observation point:
/// `total_created - total_destroyed - free - outstanding == 0`.
#[derive(Debug)]
pub struct ParticlePool {
    free: Vec<Particle>,
    pool_size: usize,
    hits: u64,
    misses: u64,
    created: u64,
    destroyed: u64,
    epoch: u32,
    next_serial: u64,
}

impl ParticlePool {
    /// Creates an empty pool with the given free-list capacity.
    pub fn new(pool_size: usize) -> Self {
        Self {
            free: Vec::with_capacity(pool_size),
            pool_size,
            hits: 0,
            misses: 0,
            created: 0,
            destroyed: 0,
            epoch: 0,
            next_serial: 0,
        }
    }

    /// Creates a pool from configuration.
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.pool_size)
    }

    /// Issues a particle initialized from `params`, reusing a pooled one when
    /// available.
    pub fn get_particle<R: Rng + ?Sized>(&mut self, params: &SpawnParams, rng: &mut R) -> Particle {
        match self.free.pop() {
            Some(mut particle) => {
                self.hits += 1;
                particle.reset(params, rng);
                particle
            }
            None => {
                self.misses += 1;
                self.created += 1;
                let serial = self.next_serial;
                self.next_serial += 1;
                Particle::new(serial, self.epoch, params, rng)
            }
        }
    }

    /// Takes a particle back. Transient caches are cleared before it joins
    /// the free list.
    pub fn return_particle(&mut self, mut particle: Particle) -> ReturnOutcome {
        if particle.pool_epoch != self.epoch {
            return ReturnOutcome::Stale;
        }
        if self.free.len() >= self.pool_size {
            self.destroyed += 1;
            return ReturnOutcome::Destroyed;
        }
        particle.clear_transient();
        self.free.push(particle);
        ReturnOutcome::Pooled
    }

    /// Trims the free list back to `pool_size`, counting trimmed particles as
    /// destroyed. Returns how many were trimmed.
    pub fn refresh_pool(&mut self) -> usize {
        let excess = self.free.len().saturating_sub(self.pool_size);
        if excess > 0 {
            self.free.truncate(self.pool_size);
            self.destroyed += excess as u64;
            log::trace!("Particle pool trimmed {excess} free particles");
        }
        excess
    }

    /// Changes the free-list capacity, trimming any excess immediately.
    pub fn set_pool_size(&mut self, pool_size: usize) {
        if pool_size != self.pool_size {
            log::debug!("Particle pool size {} -> {}", self.pool_size, pool_size);
        }
        self.pool_size = pool_size;
        self.refresh_pool();
    }

    /// Empties the free list and resets every counter.
    ///
    /// Particles still outstanding belong to the previous epoch; returning
    /// them later is a no-op.
    pub fn clear(&mut self) {
        self.free.clear();
        self.hits = 0;
        self.misses = 0;
        self.created = 0;
        self.destroyed = 0;
        self.epoch = self.epoch.wrapping_add(1);
        log::debug!("Particle pool cleared (epoch {})", self.epoch);
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pool_size: self.pool_size,
            pool_hits: self.hits,
            pool_misses: self.misses,
            total_created: self.created,
            total_destroyed: self.destroyed,
            free: self.free.len(),
        }
    }

    /// Free-list capacity.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Current free-list length.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Particles issued in the current epoch and not yet returned.
    pub fn outstanding(&self) -> u64 {
        self.stats().outstanding()
    }

    /// `true` when more particles are outstanding than the caller expects to
    /// hold at once.
    pub fn leak_suspected(&self, outstanding_budget: u64) -> bool {
        self.outstanding() > outstanding_budget
    }
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::from_config(&PoolConfig::default())
    }
}
