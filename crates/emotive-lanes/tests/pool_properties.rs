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

//! Conservation and capacity properties of the particle pool.

use emotive_lanes::particle_lane::{Behavior, Particle, ParticlePool, ReturnOutcome, SpawnParams};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
enum Op {
    Get,
    Return(usize),
    Refresh,
    Resize(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Get),
        4 => (0usize..64).prop_map(Op::Return),
        1 => Just(Op::Refresh),
        1 => (0usize..8).prop_map(Op::Resize),
        1 => Just(Op::Clear),
    ]
}

fn params() -> SpawnParams {
    SpawnParams::new(100.0, 100.0, Behavior::Ambient).with_colors(["#ff8800"])
}

fn check_conservation(pool: &ParticlePool, outstanding: u64) -> Result<(), TestCaseError> {
    let stats = pool.stats();
    prop_assert_eq!(
        stats.total_created as i128
            - stats.total_destroyed as i128
            - stats.free as i128
            - outstanding as i128,
        0
    );
    Ok(())
}

proptest! {
    #[test]
    fn test_pool_conserves_particles(
        pool_size in 0usize..8,
        ops in prop::collection::vec(op(), 0..200),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pool = ParticlePool::new(pool_size);
        // Particles issued in the current epoch.
        let mut held: Vec<Particle> = Vec::new();
        // Particles issued before the last clear; they no longer count.
        let mut stale: Vec<Particle> = Vec::new();

        for op in ops {
            match op {
                Op::Get => held.push(pool.get_particle(&params(), &mut rng)),
                Op::Return(i) => {
                    let total = held.len() + stale.len();
                    if total > 0 {
                        let i = i % total;
                        if i < held.len() {
                            let free_before = pool.free_len();
                            let destroyed_before = pool.stats().total_destroyed;
                            match pool.return_particle(held.swap_remove(i)) {
                                ReturnOutcome::Pooled => {
                                    prop_assert_eq!(pool.free_len(), free_before + 1);
                                }
                                ReturnOutcome::Destroyed => {
                                    prop_assert_eq!(pool.free_len(), free_before);
                                    prop_assert_eq!(pool.stats().total_destroyed, destroyed_before + 1);
                                }
                                ReturnOutcome::Stale => {
                                    prop_assert!(false, "current particle reported stale");
                                }
                            }
                        } else {
                            let p = stale.swap_remove(i - held.len());
                            prop_assert_eq!(pool.return_particle(p), ReturnOutcome::Stale);
                        }
                        prop_assert!(pool.free_len() <= pool.pool_size());
                    }
                }
                Op::Refresh => {
                    pool.refresh_pool();
                    prop_assert!(pool.free_len() <= pool.pool_size());
                }
                Op::Resize(n) => {
                    pool.set_pool_size(n);
                    prop_assert!(pool.free_len() <= n);
                }
                Op::Clear => {
                    pool.clear();
                    stale.append(&mut held);
                }
            }
            check_conservation(&pool, held.len() as u64)?;
            prop_assert_eq!(pool.outstanding(), held.len() as u64);
        }
    }

    #[test]
    fn test_reused_particles_have_no_stale_caches(seed in any::<u64>(), rounds in 1usize..20) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pool = ParticlePool::new(4);
        let glowing = SpawnParams::new(0.0, 0.0, Behavior::Radiant);
        for _ in 0..rounds {
            let mut p = pool.get_particle(&glowing, &mut rng);
            prop_assert!(p.cached_gradient.is_none());
            p.prepare_render_cache();
            p.set_gesture_behavior(Some(Behavior::Burst));
            pool.return_particle(p);
        }
        let reused = pool.get_particle(&params(), &mut rng);
        prop_assert!(reused.cached_gradient.is_none());
        prop_assert!(reused.gesture_behavior.is_none());
        prop_assert_eq!(reused.life, 1.0);
        prop_assert_eq!(reused.behavior, Behavior::Ambient);
    }
}

#[test]
fn test_scenario_pool_of_two() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut pool = ParticlePool::new(2);
    let p1 = pool.get_particle(&params(), &mut rng);
    let p2 = pool.get_particle(&params(), &mut rng);
    let p3 = pool.get_particle(&params(), &mut rng);

    let stats = pool.stats();
    assert_eq!(stats.total_created, 3);
    assert_eq!(stats.pool_misses, 3);

    pool.return_particle(p1);
    pool.return_particle(p2);
    assert_eq!(pool.free_len(), 2);

    assert_eq!(pool.return_particle(p3), ReturnOutcome::Destroyed);
    assert_eq!(pool.free_len(), 2);
    assert_eq!(pool.stats().total_destroyed, 1);
}

#[test]
fn test_reused_particle_has_cleared_gradient() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut pool = ParticlePool::new(1);
    let mut p = pool.get_particle(&SpawnParams::new(0.0, 0.0, Behavior::Zen), &mut rng);
    p.prepare_render_cache();
    assert!(p.cached_gradient.is_some());
    let serial = p.serial();
    pool.return_particle(p);

    let reused = pool.get_particle(&SpawnParams::new(0.0, 0.0, Behavior::Zen), &mut rng);
    assert_eq!(reused.serial(), serial);
    assert!(reused.cached_gradient.is_none());
}
