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

//! The engine composition root.
//!
//! `Engine` builds every subsystem from an [`EngineConfig`] and wires them
//! together through the scheduler. Nothing here is global: two engines in
//! one process share no state.

use crate::animation_loop::{AnimationLoopManager, CallbackId, FrameCallback, FrameOutcome, LoopStats};
use crate::config::{EmitterConfig, EngineConfig};
use crate::priority::Priority;
use crate::targets::{AudioGate, TargetFpsRelay};
use anyhow::{anyhow, bail, Context};
use emotive_control::{DegradationEvent, DegradationManager, DegradationStatus, Transition};
use emotive_core::clock::{Clock, MonotonicClock};
use emotive_core::math::Rgba;
use emotive_core::renderer::DrawSurface;
use emotive_core::telemetry::MemoryProbe;
use emotive_lanes::{
    GestureTransform, ParticleRenderer, ParticleSystem, ParticleSystemStats, SimulationContext,
    SpawnParams,
};
use emotive_telemetry::PerformanceSampler;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Engine-wide snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Scheduler.
    pub scheduler: LoopStats,
    /// Particles and pool.
    pub particles: ParticleSystemStats,
    /// Degradation controller.
    pub degradation: DegradationStatus,
    /// Whether audio may run.
    pub audio_enabled: bool,
    /// Highest memory reading, when a probe is installed.
    pub peak_memory_mb: Option<f32>,
}

/// A fully wired engine instance.
pub struct Engine {
    config: EngineConfig,
    scheduler: AnimationLoopManager,
    particles: Rc<RefCell<ParticleSystem>>,
    renderer: Rc<RefCell<ParticleRenderer>>,
    degradation: Rc<RefCell<DegradationManager>>,
    sampler: Rc<RefCell<PerformanceSampler>>,
    fps_relay: Rc<RefCell<TargetFpsRelay>>,
    audio: Rc<RefCell<AudioGate>>,
    gesture: Rc<RefCell<Option<GestureTransform>>>,
    rng: Rc<RefCell<StdRng>>,
    fallback: Rgba,
    installed: Vec<CallbackId>,
}

impl Engine {
    /// Builds an engine on the wall clock.
    pub fn new(config: EngineConfig, probe: Option<Box<dyn MemoryProbe>>) -> anyhow::Result<Self> {
        Self::with_clock(config, probe, Box::new(MonotonicClock::new()))
    }

    /// Builds an engine whose degradation controller reads `clock`.
    pub fn with_clock(
        config: EngineConfig,
        probe: Option<Box<dyn MemoryProbe>>,
        clock: Box<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let fallback = Rgba::from_hex(&config.fallback_color)
            .ok_or_else(|| anyhow!("Invalid fallback color '{}'", config.fallback_color))?;

        let scheduler = AnimationLoopManager::new(config.scheduler.clone());
        let mut degradation = DegradationManager::with_clock(config.degradation.clone(), clock)
            .context("Invalid degradation configuration")?;

        let particles = Rc::new(RefCell::new(ParticleSystem::new(&config.particles)));
        let renderer = Rc::new(RefCell::new(ParticleRenderer::new(config.particles.viewport)));
        let fps_relay = Rc::new(RefCell::new(TargetFpsRelay::new(scheduler.target_fps())));
        let audio = Rc::new(RefCell::new(AudioGate::new()));

        degradation.register_target(particles.clone());
        degradation.register_target(renderer.clone());
        degradation.register_target(fps_relay.clone());
        degradation.register_target(audio.clone());

        let sampler = PerformanceSampler::new(&config.telemetry, probe);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "Engine created: {} particles max, {} fps target, level '{}'",
            config.particles.max_particles,
            scheduler.target_fps(),
            degradation.current_level().name
        );

        Ok(Self {
            scheduler,
            particles,
            renderer,
            degradation: Rc::new(RefCell::new(degradation)),
            sampler: Rc::new(RefCell::new(sampler)),
            fps_relay,
            audio,
            gesture: Rc::new(RefCell::new(None)),
            rng: Rc::new(RefCell::new(rng)),
            fallback,
            installed: Vec::new(),
            config,
        })
    }

    /// Registers the engine's frame work, drawing onto `surface`. Starts the
    /// scheduler.
    pub fn install<S: DrawSurface + 'static>(&mut self, surface: Rc<RefCell<S>>) -> anyhow::Result<()> {
        if !self.installed.is_empty() {
            bail!("Engine callbacks are already installed");
        }

        let report = self.report_callback();
        let simulate = self.simulate_callback(surface);
        let emit = self.emit_callback(&self.config.emitter);

        self.installed = vec![
            self.scheduler.register(report, Priority::Critical),
            self.scheduler.register(simulate, Priority::High),
            self.scheduler.register(emit, Priority::Low),
        ];
        log::info!("Engine callbacks installed: {:?}", self.installed);
        Ok(())
    }

    fn simulate_callback<S: DrawSurface + 'static>(&self, surface: Rc<RefCell<S>>) -> FrameCallback {
        let particles = self.particles.clone();
        let renderer = self.renderer.clone();
        let gesture = self.gesture.clone();
        let viewport = self.config.particles.viewport;
        let fallback = self.fallback;
        Box::new(move |ctx| {
            let mut sim = SimulationContext::new(viewport);
            sim.time_ms = ctx.now_ms;

            let mut system = particles.borrow_mut();
            system.update(ctx.delta_ms as f32, &sim);

            let mut gesture = gesture.borrow_mut();
            if let Some(g) = gesture.as_mut() {
                g.time_ms = ctx.now_ms;
            }
            let mut surface = surface.borrow_mut();
            system.render(&mut *surface, &renderer.borrow(), fallback, gesture.as_ref());
            Ok(())
        })
    }

    fn emit_callback(&self, emitter: &EmitterConfig) -> FrameCallback {
        let particles = self.particles.clone();
        let rng = self.rng.clone();
        let rate = emitter.rate_per_sec;
        let params = self.emitter_params(emitter);
        Box::new(move |ctx| {
            particles
                .borrow_mut()
                .emit(rate, ctx.delta_ms as f32, &params, &mut *rng.borrow_mut());
            Ok(())
        })
    }

    fn report_callback(&self) -> FrameCallback {
        let sampler = self.sampler.clone();
        let degradation = self.degradation.clone();
        let relay = self.fps_relay.clone();
        Box::new(move |ctx| {
            let Some(sample) = sampler.borrow_mut().record_frame(ctx.delta_ms) else {
                return Ok(());
            };
            let result = degradation.borrow_mut().check_performance_enhanced(sample);
            match (&result.error, &result.transition) {
                (Some(failure), _) => {
                    log::warn!("Performance check failed ({}): {}", failure.kind, failure.message)
                }
                (None, Some(Transition::Degraded { from, to })) => {
                    log::info!("Degraded {from} -> {to} at {:.1} fps", sample.fps)
                }
                (None, Some(Transition::Recovered { from, to })) => {
                    log::info!("Recovered {from} -> {to} at {:.1} fps", sample.fps)
                }
                _ => {}
            }
            if let Some(fps) = relay.borrow_mut().take_pending() {
                ctx.set_target_fps(fps)?;
            }
            Ok(())
        })
    }

    fn emitter_params(&self, emitter: &EmitterConfig) -> SpawnParams {
        let center = self.config.particles.viewport.center();
        let mut params = SpawnParams::new(center.x, center.y, emitter.behavior)
            .with_size_multiplier(emitter.size_multiplier)
            .with_life_multiplier(emitter.life_multiplier)
            .with_emotion(emitter.emotion.clone());
        if let Some(colors) = &emitter.colors {
            params = params.with_colors(colors.iter().cloned());
        }
        params
    }

    /// Runs one host tick.
    pub fn frame(&mut self, now_ms: f64) -> FrameOutcome {
        self.scheduler.frame(now_ms)
    }

    /// Spawns a burst outside the emitter. Returns how many were spawned.
    pub fn spawn(&mut self, count: usize, params: &SpawnParams) -> usize {
        let mut rng = self.rng.borrow_mut();
        self.particles.borrow_mut().spawn(count, params, &mut *rng)
    }

    /// Sets or clears the gesture overlay.
    pub fn set_gesture(&mut self, gesture: Option<GestureTransform>) {
        *self.gesture.borrow_mut() = gesture;
    }

    /// Subscribes to degradation events.
    pub fn subscribe_degradation(&mut self) -> flume::Receiver<DegradationEvent> {
        self.degradation.borrow_mut().subscribe()
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &AnimationLoopManager {
        &self.scheduler
    }

    /// Mutable access to the scheduler.
    pub fn scheduler_mut(&mut self) -> &mut AnimationLoopManager {
        &mut self.scheduler
    }

    /// The particle system. Must not be held across [`frame`](Self::frame).
    pub fn particles(&self) -> Ref<'_, ParticleSystem> {
        self.particles.borrow()
    }

    /// The degradation controller.
    pub fn degradation(&self) -> Ref<'_, DegradationManager> {
        self.degradation.borrow()
    }

    /// Mutable access to the degradation controller, for manual levels and
    /// feature toggles.
    pub fn degradation_mut(&self) -> RefMut<'_, DegradationManager> {
        self.degradation.borrow_mut()
    }

    /// The renderer.
    pub fn renderer(&self) -> Ref<'_, ParticleRenderer> {
        self.renderer.borrow()
    }

    /// Whether audio may run at the current level.
    pub fn audio_enabled(&self) -> bool {
        self.audio.borrow().is_enabled()
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current snapshot.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            scheduler: self.scheduler.stats(),
            particles: self.particles.borrow().stats(),
            degradation: self.degradation.borrow().degradation_status(),
            audio_enabled: self.audio_enabled(),
            peak_memory_mb: self.sampler.borrow().peak_memory_mb(),
        }
    }

    /// Stops the scheduler, drops every callback, and returns live particles
    /// to the pool.
    pub fn shutdown(&mut self) {
        self.scheduler.destroy();
        self.installed.clear();
        self.particles.borrow_mut().clear();
        log::info!("Engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.installed.is_empty() {
            self.shutdown();
        }
    }
}
