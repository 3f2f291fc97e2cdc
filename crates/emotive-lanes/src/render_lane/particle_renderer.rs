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

//! Batched particle drawing.

use super::gesture::GestureTransform;
use crate::particle_lane::{DrawPath, GlowGradient, Particle};
use emotive_core::control::{DegradationLevel, DegradationTarget, Feature, FeatureSet};
use emotive_core::math::{Rgba, TAU};
use emotive_core::renderer::{DrawSurface, Viewport};
use serde::{Deserialize, Serialize};

/// Smallest radius the renderer will draw.
const MIN_RADIUS: f32 = 0.1;

/// Which optional draw paths are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Draw glow halos.
    pub glow: bool,
    /// Draw outlines for cell-shaded particles.
    pub cell_shading: bool,
    /// Honor gesture overlays.
    pub gesture_overlays: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            glow: true,
            cell_shading: true,
            gesture_overlays: true,
        }
    }
}

/// Counters for one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderStats {
    /// Particles drawn.
    pub drawn: usize,
    /// Dead particles skipped.
    pub skipped_dead: usize,
    /// Particles outside the viewport (layered rendering only).
    pub culled: usize,
    /// Particles on the other depth layer (layered rendering only).
    pub other_layer: usize,
    /// Gesture overlay rings drawn.
    pub overlays: usize,
}

/// Draws particles onto a [`DrawSurface`].
///
/// The renderer holds no per-frame state: every call leaves the surface's
/// save stack as it found it.
#[derive(Debug, Clone)]
pub struct ParticleRenderer {
    viewport: Viewport,
    cull_margin: f32,
    options: RenderOptions,
}

impl ParticleRenderer {
    /// Creates a renderer for `viewport` with every draw path enabled.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            cull_margin: 20.0,
            options: RenderOptions::default(),
        }
    }

    /// Sets how far outside the viewport a particle may be and still draw.
    pub fn with_cull_margin(mut self, margin: f32) -> Self {
        self.cull_margin = margin.max(0.0);
        self
    }

    /// Replaces the draw options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Mutable options.
    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    /// The culling viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resizes the culling viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The draw path actually taken once options are applied.
    pub fn effective_path(&self, particle: &Particle) -> DrawPath {
        match particle.draw_path() {
            DrawPath::CellShaded if self.options.cell_shading => DrawPath::CellShaded,
            DrawPath::Glow | DrawPath::CellShaded if self.options.glow && particle.has_glow => {
                DrawPath::Glow
            }
            _ => DrawPath::Plain,
        }
    }

    /// Draws every live particle in slice order.
    pub fn render(
        &self,
        surface: &mut dyn DrawSurface,
        particles: &[Particle],
        fallback: Rgba,
        gesture: Option<&GestureTransform>,
    ) -> RenderStats {
        let gesture = gesture.filter(|g| self.options.gesture_overlays && !g.is_identity());
        let mut stats = RenderStats::default();

        surface.save();
        for particle in particles {
            if !particle.is_alive() {
                stats.skipped_dead += 1;
                continue;
            }
            self.draw_particle(surface, particle, fallback, gesture, &mut stats);
        }
        surface.restore();
        stats
    }

    /// Draws one depth layer: `z < 0` is background, `z >= 0` foreground.
    ///
    /// Off-screen particles are culled and the rest are stably grouped by
    /// draw path so particles sharing surface state are contiguous.
    pub fn render_layer(
        &self,
        surface: &mut dyn DrawSurface,
        particles: &[Particle],
        fallback: Rgba,
        foreground: bool,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        let mut batch: Vec<(DrawPath, &Particle)> = Vec::with_capacity(particles.len());

        for particle in particles {
            if !particle.is_alive() {
                stats.skipped_dead += 1;
                continue;
            }
            if (particle.z >= 0.0) != foreground {
                stats.other_layer += 1;
                continue;
            }
            let radius = draw_radius(particle) * particle.glow_size_multiplier.max(1.0);
            if !self
                .viewport
                .overlaps_circle(particle.position, radius, self.cull_margin)
            {
                stats.culled += 1;
                continue;
            }
            batch.push((self.effective_path(particle), particle));
        }
        batch.sort_by_key(|(path, _)| *path);

        surface.save();
        for (_, particle) in batch {
            self.draw_particle(surface, particle, fallback, None, &mut stats);
        }
        surface.restore();
        stats
    }

    fn draw_particle(
        &self,
        surface: &mut dyn DrawSurface,
        particle: &Particle,
        fallback: Rgba,
        gesture: Option<&GestureTransform>,
        stats: &mut RenderStats,
    ) {
        let mut alpha = particle.opacity.clamp(0.0, 1.0);
        let mut radius = draw_radius(particle);
        if let Some(g) = gesture {
            alpha = g.alpha(particle, alpha);
            radius = g.radius(particle, radius).max(MIN_RADIUS);
        }
        let color = resolve_color(particle, fallback);

        match self.effective_path(particle) {
            DrawPath::Plain => {
                fill_circle(surface, particle, radius, color, alpha);
            }
            DrawPath::Glow => {
                let computed;
                let gradient = match particle.cached_gradient.as_ref() {
                    Some(cached) => cached,
                    None => {
                        computed = GlowGradient::for_particle(particle);
                        &computed
                    }
                };
                for (fraction, stop_alpha) in gradient.stops {
                    let halo = radius * gradient.radius_multiplier * fraction;
                    fill_circle(surface, particle, halo, color, alpha * stop_alpha);
                }
                fill_circle(surface, particle, radius, color, alpha);
            }
            DrawPath::CellShaded => {
                fill_circle(surface, particle, radius, color, alpha);
                surface.set_stroke_color(color.darken(0.5));
                surface.set_line_width((radius * 0.25).max(1.0));
                surface.stroke();
            }
        }
        stats.drawn += 1;

        if let Some(halo_alpha) = gesture.and_then(|g| g.halo_alpha(alpha)) {
            fill_circle(surface, particle, radius * 2.0, color.lighten(0.3), halo_alpha);
            stats.overlays += 1;
        }
    }
}

impl DegradationTarget for ParticleRenderer {
    fn target_name(&self) -> &str {
        "renderer"
    }

    fn apply_level(&mut self, level: &DegradationLevel, available: &FeatureSet) {
        self.options = RenderOptions {
            glow: available.contains(Feature::Glow),
            cell_shading: available.contains(Feature::CellShading),
            gesture_overlays: available.contains(Feature::GestureOverlays),
        };
        log::debug!("Render options for '{}': {:?}", level.name, self.options);
    }
}

fn draw_radius(particle: &Particle) -> f32 {
    let size = particle.depth_adjusted_size();
    if size.is_finite() {
        size.max(MIN_RADIUS)
    } else {
        particle.base_size.max(MIN_RADIUS)
    }
}

fn resolve_color(particle: &Particle, fallback: Rgba) -> Rgba {
    if let Some(tint) = particle.cached_gradient.as_ref().and_then(|g| g.tint) {
        return tint;
    }
    particle
        .color
        .as_deref()
        .and_then(Rgba::from_hex)
        .unwrap_or(fallback)
}

fn fill_circle(surface: &mut dyn DrawSurface, particle: &Particle, radius: f32, color: Rgba, alpha: f32) {
    surface.set_global_alpha(alpha);
    surface.set_fill_color(color);
    surface.begin_path();
    surface.arc(particle.position, radius, 0.0, TAU);
    surface.fill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle_lane::{Behavior, ParticlePool, SpawnParams};
    use emotive_core::math::Vec2;
    use emotive_core::renderer::{DrawCommand, RecordingSurface};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make(pool: &mut ParticlePool, rng: &mut StdRng, behavior: Behavior, x: f32, z: f32) -> Particle {
        let mut p = pool.get_particle(&SpawnParams::new(x, 100.0, behavior), rng);
        p.z = z;
        p.opacity = 1.0;
        p
    }

    fn renderer() -> ParticleRenderer {
        ParticleRenderer::new(Viewport::new(400.0, 400.0))
    }

    #[test]
    fn test_render_skips_dead_and_balances_stack() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ParticlePool::new(8);
        let alive = make(&mut pool, &mut rng, Behavior::Ambient, 50.0, 0.0);
        let mut dead = make(&mut pool, &mut rng, Behavior::Ambient, 60.0, 0.0);
        dead.life = 0.0;

        let mut surface = RecordingSurface::new();
        let stats = renderer().render(&mut surface, &[alive, dead], Rgba::WHITE, None);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.skipped_dead, 1);
        assert!(surface.is_balanced());
        assert_eq!(surface.arc_count(), 1);
    }

    #[test]
    fn test_radius_is_floored() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = ParticlePool::new(2);
        let mut p = make(&mut pool, &mut rng, Behavior::Ambient, 50.0, 0.0);
        p.size = 0.0;
        let mut surface = RecordingSurface::new();
        renderer().render(&mut surface, &[p], Rgba::WHITE, None);
        let radius = surface.commands().iter().find_map(|c| match c {
            DrawCommand::Arc { radius, .. } => Some(*radius),
            _ => None,
        });
        assert_eq!(radius, Some(MIN_RADIUS));
    }

    #[test]
    fn test_fallback_color_used_without_palette() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = ParticlePool::new(2);
        let p = make(&mut pool, &mut rng, Behavior::Ambient, 50.0, 0.0);
        let fallback = Rgba::rgb(0.2, 0.4, 0.6);
        let mut surface = RecordingSurface::new();
        renderer().render(&mut surface, &[p], fallback, None);
        assert!(surface.commands().contains(&DrawCommand::FillColor(fallback)));
    }

    #[test]
    fn test_layer_partitions_by_depth_and_culls() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = ParticlePool::new(8);
        let front = make(&mut pool, &mut rng, Behavior::Ambient, 50.0, 0.5);
        let back = make(&mut pool, &mut rng, Behavior::Ambient, 60.0, -0.5);
        let mut offscreen = make(&mut pool, &mut rng, Behavior::Ambient, 0.0, 0.2);
        offscreen.position = Vec2::new(-500.0, 100.0);
        let particles = [front, back, offscreen];

        let mut surface = RecordingSurface::new();
        let stats = renderer().render_layer(&mut surface, &particles, Rgba::WHITE, true);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.other_layer, 1);
        assert_eq!(stats.culled, 1);

        let mut surface = RecordingSurface::new();
        let stats = renderer().render_layer(&mut surface, &particles, Rgba::WHITE, false);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.other_layer, 2);
    }

    #[test]
    fn test_layer_groups_cell_shaded_particles() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = ParticlePool::new(16);
        let particles: Vec<Particle> = (0..8)
            .map(|i| {
                let behavior = if i % 2 == 0 {
                    Behavior::Ambient
                } else {
                    Behavior::Glitchy
                };
                make(&mut pool, &mut rng, behavior, 40.0 + i as f32 * 30.0, 0.5)
            })
            .collect();

        let mut surface = RecordingSurface::new();
        renderer().render_layer(&mut surface, &particles, Rgba::WHITE, true);
        let commands = surface.commands();
        let first_stroke = commands
            .iter()
            .position(|c| *c == DrawCommand::Stroke)
            .expect("cell-shaded particles stroke");
        let fills_after = commands[first_stroke..]
            .iter()
            .filter(|c| **c == DrawCommand::Fill)
            .count();
        let strokes = commands.iter().filter(|c| **c == DrawCommand::Stroke).count();
        assert_eq!(strokes, 4);
        // Every plain fill happened before the first outline.
        assert_eq!(fills_after, strokes - 1);
    }

    #[test]
    fn test_disabled_options_fall_back_to_plain() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut pool = ParticlePool::new(4);
        let glowing = make(&mut pool, &mut rng, Behavior::Radiant, 50.0, 0.0);
        let outlined = make(&mut pool, &mut rng, Behavior::Aggressive, 80.0, 0.0);
        let mut r = renderer();
        r.apply_level(
            &DegradationLevel::new("emergency", 3, 30.0, FeatureSet::empty()),
            &FeatureSet::empty(),
        );
        assert_eq!(r.effective_path(&glowing), DrawPath::Plain);
        assert_eq!(r.effective_path(&outlined), DrawPath::Plain);

        let mut surface = RecordingSurface::new();
        r.render(&mut surface, &[glowing, outlined], Rgba::WHITE, None);
        assert_eq!(surface.arc_count(), 2);
        assert!(!surface.commands().contains(&DrawCommand::Stroke));
    }

    #[test]
    fn test_glow_draws_halo_rings() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = ParticlePool::new(2);
        let p = make(&mut pool, &mut rng, Behavior::Radiant, 50.0, 0.0);
        let mut surface = RecordingSurface::new();
        renderer().render(&mut surface, &[p], Rgba::WHITE, None);
        assert_eq!(surface.arc_count(), 4);
    }

    #[test]
    fn test_gesture_overlay_is_additive_and_read_only() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut pool = ParticlePool::new(2);
        let p = make(&mut pool, &mut rng, Behavior::Ambient, 50.0, 0.0);
        let before = p.clone();
        let gesture = GestureTransform::at(100.0).with_glow(1.0);

        let mut surface = RecordingSurface::new();
        let particles = [p];
        let stats = renderer().render(&mut surface, &particles, Rgba::WHITE, Some(&gesture));
        assert_eq!(stats.overlays, 1);
        assert_eq!(surface.arc_count(), 2);
        assert_eq!(particles[0].position, before.position);
        assert_eq!(particles[0].opacity, before.opacity);
        assert_eq!(particles[0].size, before.size);

        let mut r = renderer();
        r.options_mut().gesture_overlays = false;
        let mut surface = RecordingSurface::new();
        let stats = r.render(&mut surface, &particles, Rgba::WHITE, Some(&gesture));
        assert_eq!(stats.overlays, 0);
    }
}
