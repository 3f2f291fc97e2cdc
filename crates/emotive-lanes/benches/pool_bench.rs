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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emotive_core::math::Rgba;
use emotive_core::renderer::{RecordingSurface, Viewport};
use emotive_lanes::particle_lane::{
    Behavior, ParticlePool, ParticleSystem, ParticleSystemConfig, SimulationContext, SpawnParams,
    FRAME_MS,
};
use emotive_lanes::render_lane::ParticleRenderer;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("Particle Pool");
    let params = SpawnParams::new(200.0, 200.0, Behavior::Burst).with_colors(["#ffcc00", "#ff6600"]);

    group.bench_function("Churn 50 (warm pool)", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ParticlePool::new(64);
        let mut held = Vec::with_capacity(50);
        b.iter(|| {
            for _ in 0..50 {
                held.push(pool.get_particle(&params, &mut rng));
            }
            for p in held.drain(..) {
                black_box(pool.return_particle(p));
            }
        });
    });

    group.bench_function("Churn 50 (no pool)", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ParticlePool::new(0);
        let mut held = Vec::with_capacity(50);
        b.iter(|| {
            for _ in 0..50 {
                held.push(pool.get_particle(&params, &mut rng));
            }
            for p in held.drain(..) {
                black_box(pool.return_particle(p));
            }
        });
    });

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("Particle Frame");
    let viewport = Viewport::new(400.0, 400.0);
    let ctx = SimulationContext::new(viewport);
    let renderer = ParticleRenderer::new(viewport);

    for behavior in [Behavior::Ambient, Behavior::Radiant, Behavior::Glitchy] {
        group.bench_function(format!("Simulate + render 50 {behavior}"), |b| {
            let mut rng = StdRng::seed_from_u64(2);
            let mut system = ParticleSystem::new(&ParticleSystemConfig::default());
            let params = SpawnParams::new(200.0, 200.0, behavior);
            let mut surface = RecordingSurface::new();
            b.iter(|| {
                system.spawn(50, &params, &mut rng);
                black_box(system.update(FRAME_MS, &ctx));
                black_box(system.render(&mut surface, &renderer, Rgba::WHITE, None));
                surface.clear();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pool, bench_frame);
criterion_main!(benches);
