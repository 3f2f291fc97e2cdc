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

//! The simulated particle and the parameters used to (re)initialize it.

use super::behavior::{Behavior, BehaviorFn, BehaviorState, SimulationContext};
use emotive_core::math::{Rgba, Vec2};
use rand::Rng;

/// Duration of one nominal frame at 60 fps, in milliseconds.
///
/// Behavior constants are tuned per nominal frame; elapsed time is converted
/// into fractional frames before being handed to an update function.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

/// Longest step, in nominal frames, a single update may take. Longer gaps
/// (a backgrounded tab, a debugger pause) are clamped so particles do not
/// teleport.
const MAX_STEP_FRAMES: f32 = 4.0;

const MIN_BASE_SIZE: f32 = 2.0;
const MAX_BASE_SIZE: f32 = 6.0;
/// Fraction of life spent fading in.
const FADE_IN: f32 = 0.15;
/// Fraction of life spent fading out.
const FADE_OUT: f32 = 0.3;
/// How strongly depth scales the drawn size (`z = ±1` gives ±30%).
const DEPTH_SIZE_FACTOR: f32 = 0.3;

/// Everything needed to issue a particle from the pool.
#[derive(Debug, Clone)]
pub struct SpawnParams {
    /// Spawn position.
    pub position: Vec2,
    /// Base behavior.
    pub behavior: Behavior,
    /// Multiplier on the randomized base size.
    pub size_multiplier: f32,
    /// Multiplier on lifetime (`2.0` lives twice as long).
    pub life_multiplier: f32,
    /// Palette to pick from; `None` draws with the renderer's fallback color.
    pub colors: Option<Vec<String>>,
    /// Emotion that requested the particle.
    pub emotion: String,
    /// Behavior that temporarily replaces the base one while a gesture runs.
    pub gesture_behavior: Option<Behavior>,
}

impl SpawnParams {
    /// Spawn parameters with unit multipliers, no palette, and a neutral
    /// emotion.
    pub fn new(x: f32, y: f32, behavior: Behavior) -> Self {
        Self {
            position: Vec2::new(x, y),
            behavior,
            size_multiplier: 1.0,
            life_multiplier: 1.0,
            colors: None,
            emotion: "neutral".to_string(),
            gesture_behavior: None,
        }
    }

    /// Sets the size multiplier.
    pub fn with_size_multiplier(mut self, multiplier: f32) -> Self {
        self.size_multiplier = multiplier;
        self
    }

    /// Sets the life multiplier.
    pub fn with_life_multiplier(mut self, multiplier: f32) -> Self {
        self.life_multiplier = multiplier;
        self
    }

    /// Sets the palette.
    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = Some(colors.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the emotion tag.
    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = emotion.into();
        self
    }

    /// Sets the gesture override.
    pub fn with_gesture_behavior(mut self, behavior: Behavior) -> Self {
        self.gesture_behavior = Some(behavior);
        self
    }
}

/// Radii and alpha stops for a particle's glow halo.
///
/// Computed lazily for glowing particles and dropped when the particle goes
/// back to the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct GlowGradient {
    /// Parsed particle color, `None` when the particle uses the fallback.
    pub tint: Option<Rgba>,
    /// Halo radius relative to the particle's drawn radius.
    pub radius_multiplier: f32,
    /// `(radius fraction, alpha)` pairs, outermost first.
    pub stops: [(f32, f32); 3],
}

impl GlowGradient {
    /// Builds the halo description for `particle`.
    pub fn for_particle(particle: &Particle) -> Self {
        Self {
            tint: particle.color.as_deref().and_then(Rgba::from_hex),
            radius_multiplier: particle.glow_size_multiplier,
            stops: [(1.0, 0.12), (0.75, 0.22), (0.5, 0.35)],
        }
    }
}

/// Which draw path a particle takes. Particles sharing a path share surface
/// state, so the layered renderer groups them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DrawPath {
    /// A single filled circle.
    Plain,
    /// Halo rings plus a filled core.
    Glow,
    /// A filled circle with a dark outline.
    CellShaded,
}

/// A single simulated particle.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Position on the surface.
    pub position: Vec2,
    /// Velocity in pixels per nominal frame.
    pub velocity: Vec2,
    /// Depth in `[-1, 1]`; negative is behind the character.
    pub z: f32,
    /// Current size (radius) in pixels.
    pub size: f32,
    /// Size chosen at spawn.
    pub base_size: f32,
    /// Current opacity.
    pub opacity: f32,
    /// Peak opacity chosen at spawn.
    pub base_opacity: f32,
    /// Hex color; `None` uses the renderer's fallback.
    pub color: Option<String>,
    /// Fraction of life remaining. Only decreases, except on reset.
    pub life: f32,
    /// Life lost per nominal frame.
    pub life_decay: f32,
    /// Base behavior.
    pub behavior: Behavior,
    /// Behavior-local scratch data.
    pub state: BehaviorState,
    /// Emotion that spawned the particle.
    pub emotion: String,
    /// Gesture override, if any.
    pub gesture_behavior: Option<Behavior>,
    /// Whether the particle draws a glow halo.
    pub has_glow: bool,
    /// Halo radius relative to the particle radius.
    pub glow_size_multiplier: f32,
    /// Whether the particle draws with an outline.
    pub is_cell_shaded: bool,
    /// Render cache; cleared on return to the pool.
    pub cached_gradient: Option<GlowGradient>,
    /// Milliseconds since spawn.
    pub age_ms: f32,
    serial: u64,
    generation: u32,
    pub(crate) pool_epoch: u32,
    seed: u32,
    update_fn: BehaviorFn,
    gesture_fn: Option<BehaviorFn>,
}

impl Particle {
    /// Constructs a fresh particle. Only the pool calls this.
    pub(crate) fn new<R: Rng + ?Sized>(
        serial: u64,
        pool_epoch: u32,
        params: &SpawnParams,
        rng: &mut R,
    ) -> Self {
        let mut particle = Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            z: 0.0,
            size: MIN_BASE_SIZE,
            base_size: MIN_BASE_SIZE,
            opacity: 0.0,
            base_opacity: 1.0,
            color: None,
            life: 1.0,
            life_decay: 0.0,
            behavior: params.behavior,
            state: BehaviorState::None,
            emotion: String::new(),
            gesture_behavior: None,
            has_glow: false,
            glow_size_multiplier: 2.0,
            is_cell_shaded: false,
            cached_gradient: None,
            age_ms: 0.0,
            serial,
            generation: 0,
            pool_epoch,
            seed: 1,
            update_fn: params.behavior.update_fn(),
            gesture_fn: None,
        };
        particle.reset(params, rng);
        particle
    }

    /// Reinitializes every field from `params`, as if freshly constructed.
    pub(crate) fn reset<R: Rng + ?Sized>(&mut self, params: &SpawnParams, rng: &mut R) {
        let size_multiplier = positive_or_one(params.size_multiplier);
        let life_multiplier = positive_or_one(params.life_multiplier);

        self.position = params.position;
        self.velocity = Vec2::ZERO;
        self.z = rng.gen_range(-1.0..=1.0);
        self.base_size = rng.gen_range(MIN_BASE_SIZE..MAX_BASE_SIZE) * size_multiplier;
        self.size = self.base_size;
        self.base_opacity = rng.gen_range(0.6..=1.0);
        self.opacity = 0.0;
        self.color = params
            .colors
            .as_ref()
            .filter(|palette| !palette.is_empty())
            .map(|palette| palette[rng.gen_range(0..palette.len())].clone());
        self.life = 1.0;
        self.emotion.clear();
        self.emotion.push_str(&params.emotion);
        self.behavior = params.behavior;
        self.state = BehaviorState::None;
        let (has_glow, is_cell_shaded) = params.behavior.default_style();
        self.has_glow = has_glow;
        self.is_cell_shaded = is_cell_shaded;
        self.glow_size_multiplier = rng.gen_range(1.5..2.5);
        self.cached_gradient = None;
        self.age_ms = 0.0;
        self.seed = rng.gen::<u32>() | 1;
        self.generation += 1;
        self.update_fn = params.behavior.update_fn();
        self.set_gesture_behavior(params.gesture_behavior);

        params.behavior.initialize(self, rng);
        self.life_decay /= life_multiplier;
    }

    /// Drops caches and scratch data before the particle is pooled.
    pub(crate) fn clear_transient(&mut self) {
        self.cached_gradient = None;
        self.state = BehaviorState::None;
        self.set_gesture_behavior(None);
    }

    /// Advances the particle by `dt_ms`. Returns `false` once it is dead.
    ///
    /// A dead particle is never updated again until it is reset.
    pub fn update(&mut self, dt_ms: f32, ctx: &SimulationContext) -> bool {
        if self.life <= 0.0 {
            return false;
        }
        let dt = (dt_ms / FRAME_MS).clamp(0.0, MAX_STEP_FRAMES);
        let step = self.gesture_fn.unwrap_or(self.update_fn);
        step(self, dt, ctx);

        self.life -= self.life_decay * dt;
        self.age_ms += dt_ms;
        self.opacity = self.base_opacity * fade(self.life);
        self.life > 0.0
    }

    /// Replaces (or clears) the gesture override. The update function is
    /// resolved here, not per frame.
    pub fn set_gesture_behavior(&mut self, behavior: Option<Behavior>) {
        self.gesture_behavior = behavior;
        self.gesture_fn = behavior.map(Behavior::update_fn);
    }

    /// Fills the glow cache if the particle glows and the cache is empty.
    pub fn prepare_render_cache(&mut self) {
        if self.has_glow && self.cached_gradient.is_none() {
            self.cached_gradient = Some(GlowGradient::for_particle(self));
        }
    }

    /// `true` while life remains.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Size scaled by depth: far particles draw smaller.
    #[inline]
    pub fn depth_adjusted_size(&self) -> f32 {
        self.size * (1.0 + self.z * DEPTH_SIZE_FACTOR)
    }

    /// The draw path this particle takes.
    #[inline]
    pub fn draw_path(&self) -> DrawPath {
        if self.is_cell_shaded {
            DrawPath::CellShaded
        } else if self.has_glow {
            DrawPath::Glow
        } else {
            DrawPath::Plain
        }
    }

    /// Identity of the underlying allocation; stable across reuse.
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// How many times this allocation has been issued.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Deterministic per-particle noise in `[0, 1)` (xorshift32).
    pub(crate) fn next_noise(&mut self) -> f32 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        (x >> 8) as f32 / (1u32 << 24) as f32
    }
}

fn positive_or_one(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Opacity envelope over remaining life.
fn fade(life: f32) -> f32 {
    let fade_in = ((1.0 - life) / FADE_IN).min(1.0);
    let fade_out = (life / FADE_OUT).min(1.0);
    fade_in.min(fade_out).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotive_core::renderer::Viewport;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx() -> SimulationContext {
        SimulationContext::new(Viewport::new(400.0, 400.0))
    }

    fn spawn(behavior: Behavior) -> Particle {
        let mut rng = StdRng::seed_from_u64(7);
        Particle::new(1, 0, &SpawnParams::new(200.0, 200.0, behavior), &mut rng)
    }

    #[test]
    fn test_new_particle_starts_full_life_and_invisible() {
        let p = spawn(Behavior::Ambient);
        assert_eq!(p.life, 1.0);
        assert_eq!(p.opacity, 0.0);
        assert!(p.life_decay > 0.0);
        assert!(p.base_size >= MIN_BASE_SIZE && p.base_size < MAX_BASE_SIZE);
        assert!(p.z >= -1.0 && p.z <= 1.0);
        assert_eq!(p.generation(), 1);
    }

    #[test]
    fn test_life_decreases_monotonically_until_death() {
        let mut p = spawn(Behavior::Burst);
        let ctx = ctx();
        let mut last = p.life;
        let mut frames = 0;
        while p.update(FRAME_MS, &ctx) {
            assert!(p.life < last);
            last = p.life;
            frames += 1;
            assert!(frames < 10_000, "particle never died");
        }
        assert!(!p.is_alive());
        // Dead particles are inert.
        let position = p.position;
        assert!(!p.update(FRAME_MS, &ctx));
        assert_eq!(p.position, position);
    }

    #[test]
    fn test_life_multiplier_extends_lifetime() {
        let mut rng = StdRng::seed_from_u64(3);
        let short = Particle::new(1, 0, &SpawnParams::new(0.0, 0.0, Behavior::Rising), &mut rng);
        let mut rng = StdRng::seed_from_u64(3);
        let long = Particle::new(
            2,
            0,
            &SpawnParams::new(0.0, 0.0, Behavior::Rising).with_life_multiplier(2.0),
            &mut rng,
        );
        assert!((short.life_decay / long.life_decay - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_multipliers_fall_back_to_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = SpawnParams::new(0.0, 0.0, Behavior::Rising)
            .with_size_multiplier(f32::NAN)
            .with_life_multiplier(-2.0);
        let p = Particle::new(1, 0, &params, &mut rng);
        assert!(p.base_size.is_finite());
        assert!(p.life_decay > 0.0);
    }

    #[test]
    fn test_color_is_picked_from_palette() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = SpawnParams::new(0.0, 0.0, Behavior::Ambient).with_colors(["#ff0000", "#00ff00"]);
        for _ in 0..20 {
            let p = Particle::new(1, 0, &params, &mut rng);
            let color = p.color.expect("palette color");
            assert!(color == "#ff0000" || color == "#00ff00");
        }
        let empty = SpawnParams {
            colors: Some(Vec::new()),
            ..SpawnParams::new(0.0, 0.0, Behavior::Ambient)
        };
        assert!(Particle::new(1, 0, &empty, &mut rng).color.is_none());
    }

    #[test]
    fn test_opacity_fades_in_then_out() {
        assert_eq!(fade(1.0), 0.0);
        assert_eq!(fade(0.5), 1.0);
        assert!(fade(0.1) < 0.5);
        assert_eq!(fade(0.0), 0.0);
    }

    #[test]
    fn test_gesture_override_replaces_base_update() {
        let ctx = ctx();
        let mut p = spawn(Behavior::Glitchy);
        p.set_gesture_behavior(Some(Behavior::Falling));
        p.velocity = Vec2::ZERO;
        let before = p.position;
        for _ in 0..10 {
            p.update(FRAME_MS, &ctx);
        }
        // Falling accelerates downwards; glitchy would stay pinned to its anchor.
        assert!(p.position.y > before.y);
        p.set_gesture_behavior(None);
        assert!(p.gesture_behavior.is_none());
    }

    #[test]
    fn test_clear_transient_drops_caches() {
        let mut p = spawn(Behavior::Radiant);
        assert!(p.has_glow);
        p.prepare_render_cache();
        assert!(p.cached_gradient.is_some());
        p.set_gesture_behavior(Some(Behavior::Orbiting));
        p.clear_transient();
        assert!(p.cached_gradient.is_none());
        assert!(p.gesture_behavior.is_none());
        assert_eq!(p.state, BehaviorState::None);
    }

    #[test]
    fn test_depth_adjusted_size_tracks_z() {
        let mut p = spawn(Behavior::Ambient);
        p.size = 10.0;
        p.z = 1.0;
        assert!((p.depth_adjusted_size() - 13.0).abs() < 1e-5);
        p.z = -1.0;
        assert!((p.depth_adjusted_size() - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let mut a = spawn(Behavior::Erratic);
        let mut b = spawn(Behavior::Erratic);
        for _ in 0..100 {
            let n = a.next_noise();
            assert_eq!(n, b.next_noise());
            assert!((0.0..1.0).contains(&n));
        }
    }
}
