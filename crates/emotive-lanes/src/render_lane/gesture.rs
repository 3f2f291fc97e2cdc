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

//! Gesture-driven visual overlays.

use crate::particle_lane::Particle;
use serde::{Deserialize, Serialize};

/// Visual modifiers a running gesture applies on top of the normal particle
/// draw.
///
/// Overlays only read particle state; the simulation never sees them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTransform {
    /// Extra halo strength in `[0, 1]`.
    pub glow: f32,
    /// Opacity flicker depth in `[0, 1]`.
    pub flicker: f32,
    /// Size shimmer depth in `[0, 1]`.
    pub shimmer: f32,
    /// Gesture-local time driving flicker and shimmer.
    pub time_ms: f64,
}

impl GestureTransform {
    /// A transform with no overlays at `time_ms`.
    pub fn at(time_ms: f64) -> Self {
        Self {
            time_ms,
            ..Self::default()
        }
    }

    /// Sets the glow strength.
    pub fn with_glow(mut self, glow: f32) -> Self {
        self.glow = glow.clamp(0.0, 1.0);
        self
    }

    /// Sets the flicker depth.
    pub fn with_flicker(mut self, flicker: f32) -> Self {
        self.flicker = flicker.clamp(0.0, 1.0);
        self
    }

    /// Sets the shimmer depth.
    pub fn with_shimmer(mut self, shimmer: f32) -> Self {
        self.shimmer = shimmer.clamp(0.0, 1.0);
        self
    }

    /// `true` when no overlay would change the output.
    pub fn is_identity(&self) -> bool {
        self.glow <= 0.0 && self.flicker <= 0.0 && self.shimmer <= 0.0
    }

    /// Per-particle phase, so neighbours do not pulse in lockstep.
    fn phase(particle: &Particle) -> f32 {
        (particle.serial() % 97) as f32 * 0.618
    }

    /// Opacity after flicker.
    pub fn alpha(&self, particle: &Particle, alpha: f32) -> f32 {
        if self.flicker <= 0.0 {
            return alpha;
        }
        let wave = 0.5 * (1.0 + (self.time_ms as f32 * 0.02 + Self::phase(particle)).sin());
        (alpha * (1.0 - self.flicker * wave)).clamp(0.0, 1.0)
    }

    /// Radius after shimmer.
    pub fn radius(&self, particle: &Particle, radius: f32) -> f32 {
        if self.shimmer <= 0.0 {
            return radius;
        }
        let wave = (self.time_ms as f32 * 0.01 + Self::phase(particle) * 1.7).sin();
        radius * (1.0 + self.shimmer * 0.15 * wave)
    }

    /// Alpha of the extra halo ring, or `None` when glow is off.
    pub fn halo_alpha(&self, alpha: f32) -> Option<f32> {
        (self.glow > 0.0).then(|| (alpha * self.glow * 0.3).clamp(0.0, 1.0))
    }
}
