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

//! Particle behaviors.
//!
//! Every behavior is a variant of the closed [`Behavior`] enum. A variant
//! supplies an initializer (velocity, life decay, scratch state) and an update
//! function. The update function is resolved once when a particle is
//! (re)initialized and stored on the particle as a plain function pointer.

use super::particle::Particle;
use emotive_core::error::ContractError;
use emotive_core::math::{Vec2, TAU};
use emotive_core::renderer::Viewport;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-frame update for one behavior. `dt` is in nominal frames.
pub type BehaviorFn = fn(&mut Particle, f32, &SimulationContext);

/// World state visible to behavior update functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationContext {
    /// The point particles orbit around or flee from (the character's core).
    pub center: Vec2,
    /// The visible area.
    pub viewport: Viewport,
    /// Host time of the current step.
    pub time_ms: f64,
}

impl SimulationContext {
    /// A context centered in `viewport`, at time zero.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            center: viewport.center(),
            viewport,
            time_ms: 0.0,
        }
    }

    /// Moves the attraction center.
    pub fn with_center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }
}

/// Behavior-local scratch data. Cleared when a particle goes back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BehaviorState {
    /// Nothing stored.
    #[default]
    None,
    /// Circular motion around the simulation center.
    Orbit {
        /// Current angle in radians.
        angle: f32,
        /// Orbit radius in pixels.
        radius: f32,
        /// Radians per nominal frame.
        angular_speed: f32,
    },
    /// Waiting to pop.
    Popcorn {
        /// Frames left before the pop.
        delay: f32,
        /// Whether the pop already happened.
        popped: bool,
    },
    /// Pinned to an anchor with occasional jumps.
    Glitch {
        /// Rest position.
        anchor: Vec2,
        /// Frames until the next jump.
        timer: f32,
    },
    /// Slow breathing.
    Zen {
        /// Breathing phase in radians.
        phase: f32,
    },
    /// Move-then-pause cycle.
    Cautious {
        /// Frames left in the current pause, or zero while moving.
        pause: f32,
        /// Frames until the next pause.
        until_pause: f32,
    },
}

/// How a particle moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Slow, undirected drift.
    Ambient,
    /// Floats upwards with a slight wobble.
    Rising,
    /// Drops under gravity.
    Falling,
    /// Sits still, then pops outwards and falls.
    Popcorn,
    /// Explodes outwards and slows down.
    Burst,
    /// Fast, jittery, and capped in speed.
    Aggressive,
    /// Accelerates away from the center.
    Scattering,
    /// Pushed away strongly when close to the center.
    Repelling,
    /// Circles the center.
    Orbiting,
    /// Pinned in place with sudden jumps.
    Glitchy,
    /// Rising bubbles with random jitter.
    Fizzy,
    /// Barely moves and breathes in size.
    Zen,
    /// Drifts outwards from the center with a halo.
    Radiant,
    /// Accelerates upwards in a loose spiral.
    Ascending,
    /// Changes direction at random.
    Erratic,
    /// Moves a little, stops, looks around.
    Cautious,
}

impl Behavior {
    /// Every behavior, in declaration order.
    pub const ALL: [Behavior; 16] = [
        Behavior::Ambient,
        Behavior::Rising,
        Behavior::Falling,
        Behavior::Popcorn,
        Behavior::Burst,
        Behavior::Aggressive,
        Behavior::Scattering,
        Behavior::Repelling,
        Behavior::Orbiting,
        Behavior::Glitchy,
        Behavior::Fizzy,
        Behavior::Zen,
        Behavior::Radiant,
        Behavior::Ascending,
        Behavior::Erratic,
        Behavior::Cautious,
    ];

    /// The tag string.
    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Ambient => "ambient",
            Behavior::Rising => "rising",
            Behavior::Falling => "falling",
            Behavior::Popcorn => "popcorn",
            Behavior::Burst => "burst",
            Behavior::Aggressive => "aggressive",
            Behavior::Scattering => "scattering",
            Behavior::Repelling => "repelling",
            Behavior::Orbiting => "orbiting",
            Behavior::Glitchy => "glitchy",
            Behavior::Fizzy => "fizzy",
            Behavior::Zen => "zen",
            Behavior::Radiant => "radiant",
            Behavior::Ascending => "ascending",
            Behavior::Erratic => "erratic",
            Behavior::Cautious => "cautious",
        }
    }

    /// The update function for this behavior.
    pub fn update_fn(self) -> BehaviorFn {
        match self {
            Behavior::Ambient => update_ambient,
            Behavior::Rising => update_rising,
            Behavior::Falling => update_falling,
            Behavior::Popcorn => update_popcorn,
            Behavior::Burst => update_burst,
            Behavior::Aggressive => update_aggressive,
            Behavior::Scattering => update_scattering,
            Behavior::Repelling => update_repelling,
            Behavior::Orbiting => update_orbiting,
            Behavior::Glitchy => update_glitchy,
            Behavior::Fizzy => update_fizzy,
            Behavior::Zen => update_zen,
            Behavior::Radiant => update_radiant,
            Behavior::Ascending => update_ascending,
            Behavior::Erratic => update_erratic,
            Behavior::Cautious => update_cautious,
        }
    }

    /// `(has_glow, is_cell_shaded)` for a freshly spawned particle.
    pub fn default_style(self) -> (bool, bool) {
        match self {
            Behavior::Radiant | Behavior::Zen | Behavior::Ascending | Behavior::Orbiting => {
                (true, false)
            }
            Behavior::Aggressive | Behavior::Glitchy => (false, true),
            _ => (false, false),
        }
    }

    /// Sets velocity, life decay, and scratch state for a particle that has
    /// just been placed at its spawn position.
    pub(crate) fn initialize<R: Rng + ?Sized>(self, p: &mut Particle, rng: &mut R) {
        let angle = rng.gen_range(0.0..TAU);
        match self {
            Behavior::Ambient => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.05..0.3);
                p.life_decay = rng.gen_range(0.002..0.005);
            }
            Behavior::Rising => {
                p.velocity = Vec2::new(rng.gen_range(-0.2..0.2), -rng.gen_range(0.3..0.8));
                p.life_decay = rng.gen_range(0.004..0.008);
            }
            Behavior::Falling => {
                p.velocity = Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(0.1..0.4));
                p.life_decay = rng.gen_range(0.004..0.008);
            }
            Behavior::Popcorn => {
                p.velocity = Vec2::ZERO;
                p.life_decay = rng.gen_range(0.006..0.01);
                p.state = BehaviorState::Popcorn {
                    delay: rng.gen_range(5.0..40.0),
                    popped: false,
                };
            }
            Behavior::Burst => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(3.0..6.0);
                p.life_decay = rng.gen_range(0.015..0.03);
            }
            Behavior::Aggressive => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(1.5..3.0);
                p.life_decay = rng.gen_range(0.01..0.02);
            }
            Behavior::Scattering => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.5..1.5);
                p.life_decay = rng.gen_range(0.008..0.015);
            }
            Behavior::Repelling => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.2..0.6);
                p.life_decay = rng.gen_range(0.006..0.012);
            }
            Behavior::Orbiting => {
                p.velocity = Vec2::ZERO;
                p.life_decay = rng.gen_range(0.003..0.006);
                let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                p.state = BehaviorState::Orbit {
                    angle,
                    radius: rng.gen_range(40.0..120.0),
                    angular_speed: direction * rng.gen_range(0.01..0.04),
                };
            }
            Behavior::Glitchy => {
                p.velocity = Vec2::ZERO;
                p.life_decay = rng.gen_range(0.008..0.015);
                p.state = BehaviorState::Glitch {
                    anchor: p.position,
                    timer: rng.gen_range(3.0..15.0),
                };
            }
            Behavior::Fizzy => {
                p.velocity = Vec2::new(rng.gen_range(-0.3..0.3), -rng.gen_range(0.5..1.2));
                p.life_decay = rng.gen_range(0.01..0.02);
            }
            Behavior::Zen => {
                p.velocity = Vec2::new(0.0, -rng.gen_range(0.02..0.08));
                p.life_decay = rng.gen_range(0.002..0.004);
                p.state = BehaviorState::Zen { phase: angle };
            }
            Behavior::Radiant => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.3..0.8);
                p.life_decay = rng.gen_range(0.004..0.008);
            }
            Behavior::Ascending => {
                p.velocity = Vec2::new(rng.gen_range(-0.2..0.2), -rng.gen_range(0.1..0.3));
                p.life_decay = rng.gen_range(0.004..0.007);
            }
            Behavior::Erratic => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.5..1.5);
                p.life_decay = rng.gen_range(0.008..0.015);
            }
            Behavior::Cautious => {
                p.velocity = Vec2::from_angle(angle) * rng.gen_range(0.2..0.5);
                p.life_decay = rng.gen_range(0.004..0.008);
                p.state = BehaviorState::Cautious {
                    pause: 0.0,
                    until_pause: rng.gen_range(10.0..30.0),
                };
            }
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Behavior {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Behavior::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ContractError::UnknownBehavior(tag.to_string()))
    }
}

// ── Update functions ──

const GRAVITY: f32 = 0.05;
const MAX_FALL_SPEED: f32 = 4.0;

fn integrate(p: &mut Particle, dt: f32) {
    p.position += p.velocity * dt;
}

fn damp(v: &mut Vec2, per_frame: f32, dt: f32) {
    *v *= per_frame.powf(dt);
}

fn update_ambient(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    let wobble = (p.next_noise() - 0.5) * 0.02;
    p.velocity.x += wobble * dt;
    p.velocity.y -= 0.002 * dt;
    damp(&mut p.velocity, 0.995, dt);
    integrate(p, dt);
}

fn update_rising(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    p.velocity.x += (p.next_noise() - 0.5) * 0.03 * dt;
    p.velocity.x *= 0.98f32.powf(dt);
    integrate(p, dt);
}

fn update_falling(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    p.velocity.y = (p.velocity.y + GRAVITY * dt).min(MAX_FALL_SPEED);
    p.velocity.x *= 0.99f32.powf(dt);
    integrate(p, dt);
}

fn update_popcorn(p: &mut Particle, dt: f32, ctx: &SimulationContext) {
    if let BehaviorState::Popcorn {
        delay,
        popped: false,
    } = p.state
    {
        let remaining = delay - dt;
        if remaining > 0.0 {
            p.state = BehaviorState::Popcorn {
                delay: remaining,
                popped: false,
            };
            return;
        }
        p.state = BehaviorState::Popcorn {
            delay: 0.0,
            popped: true,
        };
        let away = (p.position - ctx.center).normalize_or_zero();
        let kick = Vec2::new(p.next_noise() - 0.5, -1.0 - p.next_noise());
        p.velocity = (away + kick) * 2.5;
    }
    update_falling(p, dt, ctx);
}

fn update_burst(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    damp(&mut p.velocity, 0.94, dt);
    integrate(p, dt);
}

fn update_aggressive(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    let jitter = Vec2::new(p.next_noise() - 0.5, p.next_noise() - 0.5) * 0.8;
    p.velocity = (p.velocity + jitter * dt).clamp_length(4.0);
    integrate(p, dt);
}

fn update_scattering(p: &mut Particle, dt: f32, ctx: &SimulationContext) {
    let away = (p.position - ctx.center).normalize_or_zero();
    p.velocity = (p.velocity + away * (0.08 * dt)).clamp_length(5.0);
    integrate(p, dt);
}

fn update_repelling(p: &mut Particle, dt: f32, ctx: &SimulationContext) {
    let offset = p.position - ctx.center;
    let distance = offset.length().max(1.0);
    let push = (60.0 / distance).min(1.0) * 0.3;
    p.velocity += offset.normalize_or_zero() * (push * dt);
    damp(&mut p.velocity, 0.96, dt);
    integrate(p, dt);
}

fn update_orbiting(p: &mut Particle, dt: f32, ctx: &SimulationContext) {
    if let BehaviorState::Orbit {
        angle,
        radius,
        angular_speed,
    } = &mut p.state
    {
        *angle += *angular_speed * dt;
        let target = ctx.center + Vec2::from_angle(*angle) * *radius;
        p.velocity = Vec2::from_angle(*angle).perp() * (*angular_speed * *radius);
        p.position = target;
    } else {
        integrate(p, dt);
    }
}

fn update_glitchy(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    let jump = Vec2::new(p.next_noise() - 0.5, p.next_noise() - 0.5) * 24.0;
    if let BehaviorState::Glitch { anchor, timer } = &mut p.state {
        *timer -= dt;
        if *timer <= 0.0 {
            *timer = 4.0 + jump.x.abs();
            p.position = *anchor + jump;
        } else {
            p.position = *anchor;
        }
    }
}

fn update_fizzy(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    p.velocity.x = (p.velocity.x + (p.next_noise() - 0.5) * 0.4 * dt).clamp(-1.0, 1.0);
    p.velocity.y -= 0.01 * dt;
    integrate(p, dt);
}

fn update_zen(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    if let BehaviorState::Zen { phase } = &mut p.state {
        *phase += 0.03 * dt;
        p.size = p.base_size * (1.0 + 0.2 * phase.sin());
        p.velocity.x = 0.1 * (*phase * 0.5).cos();
    }
    integrate(p, dt);
}

fn update_radiant(p: &mut Particle, dt: f32, ctx: &SimulationContext) {
    let away = (p.position - ctx.center).normalize_or_zero();
    p.velocity += away * (0.01 * dt);
    damp(&mut p.velocity, 0.99, dt);
    integrate(p, dt);
}

fn update_ascending(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    p.velocity.y = (p.velocity.y - 0.02 * dt).max(-3.0);
    let swirl = (p.age_ms * 0.005).sin() * 0.05;
    p.velocity.x += swirl * dt;
    integrate(p, dt);
}

fn update_erratic(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    if p.next_noise() < 0.1 * dt.min(1.0) {
        let speed = p.velocity.length().max(0.5);
        p.velocity = Vec2::from_angle(p.next_noise() * TAU) * speed;
    }
    integrate(p, dt);
}

fn update_cautious(p: &mut Particle, dt: f32, _ctx: &SimulationContext) {
    let noise = p.next_noise();
    if let BehaviorState::Cautious { pause, until_pause } = &mut p.state {
        if *pause > 0.0 {
            *pause -= dt;
            return;
        }
        *until_pause -= dt;
        if *until_pause <= 0.0 {
            *pause = 10.0 + noise * 20.0;
            *until_pause = 10.0 + (1.0 - noise) * 20.0;
            return;
        }
    }
    integrate(p, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle_lane::particle::{SpawnParams, FRAME_MS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawn(behavior: Behavior, seed: u64) -> Particle {
        let mut rng = StdRng::seed_from_u64(seed);
        Particle::new(0, 0, &SpawnParams::new(200.0, 200.0, behavior), &mut rng)
    }

    fn ctx() -> SimulationContext {
        SimulationContext::new(Viewport::new(400.0, 400.0))
    }

    #[test]
    fn test_tags_round_trip_through_from_str() {
        for behavior in Behavior::ALL {
            assert_eq!(behavior.as_str().parse::<Behavior>(), Ok(behavior));
        }
        assert_eq!("ZEN".parse::<Behavior>(), Ok(Behavior::Zen));
        assert_eq!(
            "wiggly".parse::<Behavior>(),
            Err(ContractError::UnknownBehavior("wiggly".into()))
        );
    }

    #[test]
    fn test_every_behavior_stays_finite() {
        let ctx = ctx();
        for (i, behavior) in Behavior::ALL.into_iter().enumerate() {
            let mut p = spawn(behavior, i as u64);
            assert!(p.life_decay > 0.0, "{behavior} never dies");
            for _ in 0..120 {
                p.update(FRAME_MS, &ctx);
                assert!(p.position.x.is_finite() && p.position.y.is_finite(), "{behavior}");
                assert!(p.opacity >= 0.0 && p.opacity <= 1.0, "{behavior}");
            }
        }
    }

    #[test]
    fn test_falling_accelerates_downwards() {
        let mut p = spawn(Behavior::Falling, 1);
        let v0 = p.velocity.y;
        p.update(FRAME_MS * 2.0, &ctx());
        assert!(p.velocity.y > v0);
    }

    #[test]
    fn test_rising_moves_up() {
        let mut p = spawn(Behavior::Rising, 2);
        let y0 = p.position.y;
        for _ in 0..10 {
            p.update(FRAME_MS, &ctx());
        }
        assert!(p.position.y < y0);
    }

    #[test]
    fn test_orbiting_keeps_its_radius() {
        let ctx = ctx();
        let mut p = spawn(Behavior::Orbiting, 3);
        let BehaviorState::Orbit { radius, .. } = p.state else {
            panic!("orbit state missing");
        };
        for _ in 0..30 {
            p.update(FRAME_MS, &ctx);
            assert!((p.position.distance(ctx.center) - radius).abs() < 1e-2);
        }
    }

    #[test]
    fn test_popcorn_waits_before_popping() {
        let mut p = spawn(Behavior::Popcorn, 4);
        let start = p.position;
        p.update(FRAME_MS * 0.1, &ctx());
        assert_eq!(p.position, start);
        for _ in 0..60 {
            p.update(FRAME_MS, &ctx());
        }
        assert!(matches!(p.state, BehaviorState::Popcorn { popped: true, .. }));
        assert_ne!(p.position, start);
    }

    #[test]
    fn test_glitchy_returns_to_anchor() {
        let ctx = ctx();
        let mut p = spawn(Behavior::Glitchy, 5);
        let anchor = p.position;
        let mut at_anchor = 0;
        for _ in 0..60 {
            p.update(FRAME_MS, &ctx);
            if p.position == anchor {
                at_anchor += 1;
            }
        }
        assert!(at_anchor > 30);
    }

    #[test]
    fn test_scattering_moves_away_from_center() {
        let ctx = ctx();
        let mut rng = StdRng::seed_from_u64(6);
        let mut p = Particle::new(
            0,
            0,
            &SpawnParams::new(220.0, 200.0, Behavior::Scattering),
            &mut rng,
        );
        p.velocity = Vec2::ZERO;
        let d0 = p.position.distance(ctx.center);
        for _ in 0..20 {
            p.update(FRAME_MS, &ctx);
        }
        assert!(p.position.distance(ctx.center) > d0);
    }

    #[test]
    fn test_default_styles() {
        assert_eq!(Behavior::Radiant.default_style(), (true, false));
        assert_eq!(Behavior::Glitchy.default_style(), (false, true));
        assert_eq!(Behavior::Ambient.default_style(), (false, false));
    }
}
