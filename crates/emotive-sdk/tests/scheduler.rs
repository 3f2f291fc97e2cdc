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

//! Scheduler behavior seen from the outside.

use approx::assert_relative_eq;
use emotive_sdk::{AnimationLoopManager, FrameCallback, FrameOutcome, LoopEvent, Priority};
use std::cell::Cell;
use std::rc::Rc;

fn counter(hits: &Rc<Cell<u32>>) -> FrameCallback {
    let hits = hits.clone();
    Box::new(move |_| {
        hits.set(hits.get() + 1);
        Ok(())
    })
}

/// Drives `frames` ticks `spacing_ms` apart, starting at zero.
fn drive(sched: &mut AnimationLoopManager, frames: u32, spacing_ms: f64) {
    for i in 0..frames {
        sched.frame(f64::from(i) * spacing_ms);
    }
}

#[test]
fn test_target_fps_is_clamped_and_sets_the_budget() {
    let mut sched = AnimationLoopManager::default();
    assert_eq!(sched.set_target_fps(30.0).unwrap(), 30.0);
    assert_relative_eq!(sched.frame_budget_ms(), 33.333, epsilon = 0.01);
    assert_eq!(sched.set_target_fps(5.0).unwrap(), 15.0);
    assert_eq!(sched.set_target_fps(200.0).unwrap(), 120.0);
    assert_eq!(sched.stats().target_fps, 120.0);
}

#[test]
fn test_low_tier_is_shed_at_twenty_fps_but_critical_runs() {
    let mut sched = AnimationLoopManager::default();
    let critical = Rc::new(Cell::new(0));
    let low = Rc::new(Cell::new(0));
    sched.register(counter(&critical), Priority::Critical);
    sched.register(counter(&low), Priority::Low);

    // The first tick has no measured delta and runs at the target rate.
    drive(&mut sched, 5, 50.0);
    assert_eq!(critical.get(), 5);
    assert_eq!(low.get(), 1);
    assert_relative_eq!(sched.fps(), 20.0, epsilon = 1e-3);
    assert_eq!(sched.stats().skipped_callbacks, 1);
}

#[test]
fn test_idle_is_shed_before_low() {
    let mut sched = AnimationLoopManager::default();
    let low = Rc::new(Cell::new(0));
    let idle = Rc::new(Cell::new(0));
    sched.register(counter(&idle), Priority::Idle);
    sched.register(counter(&low), Priority::Low);

    drive(&mut sched, 4, 25.0);
    assert_eq!(low.get(), 4);
    assert_eq!(idle.get(), 1);
}

#[test]
fn test_first_registration_starts_and_last_removal_stops() {
    let mut sched = AnimationLoopManager::default();
    let events = sched.subscribe();
    assert!(!sched.is_running());
    assert_eq!(sched.frame(0.0), FrameOutcome::Stopped);

    let a = sched.register(Box::new(|_| Ok(())), Priority::High);
    assert!(sched.is_running());
    let b = sched.register(Box::new(|_| Ok(())), Priority::Idle);
    assert_ne!(a, b);

    assert!(sched.unregister(a));
    assert!(sched.is_running());
    assert!(sched.unregister(b));
    assert!(!sched.is_running());
    assert!(!sched.unregister(b));

    let seen: Vec<LoopEvent> = events.try_iter().collect();
    assert_eq!(seen, [LoopEvent::Started, LoopEvent::Stopped]);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let mut sched = AnimationLoopManager::default();
    let events = sched.subscribe();
    sched.start();
    sched.start();
    sched.stop();
    sched.stop();
    assert_eq!(events.try_iter().count(), 2);
}

#[test]
fn test_callbacks_registered_mid_tick_run_from_the_next_tick() {
    let mut sched = AnimationLoopManager::default();
    let late = Rc::new(Cell::new(0));
    let spawned = Rc::new(Cell::new(false));
    {
        let late = late.clone();
        let spawned = spawned.clone();
        sched.register(
            Box::new(move |ctx| {
                if !spawned.get() {
                    spawned.set(true);
                    ctx.register(counter(&late), Priority::Critical);
                }
                Ok(())
            }),
            Priority::High,
        );
    }

    sched.frame(0.0);
    assert_eq!(late.get(), 0);
    assert_eq!(sched.callback_count(), 2);
    sched.frame(20.0);
    assert_eq!(late.get(), 1);
}

#[test]
fn test_callbacks_can_remove_themselves() {
    let mut sched = AnimationLoopManager::default();
    let runs = Rc::new(Cell::new(0));
    {
        let runs = runs.clone();
        sched.register(
            Box::new(move |ctx| {
                runs.set(runs.get() + 1);
                ctx.unregister(ctx.callback_id);
                Ok(())
            }),
            Priority::Medium,
        );
    }
    sched.frame(0.0);
    sched.frame(20.0);
    assert_eq!(runs.get(), 1);
    assert!(!sched.is_running());
}

#[test]
fn test_failures_are_counted_and_do_not_stop_the_tick() {
    let mut sched = AnimationLoopManager::default();
    let events = sched.subscribe();
    let after = Rc::new(Cell::new(0));
    let failing = sched.register(
        Box::new(|_| Err(anyhow::anyhow!("lost the surface"))),
        Priority::Critical,
    );
    sched.register(Box::new(|_| panic!("bad particle")), Priority::High);
    sched.register(counter(&after), Priority::Medium);

    let outcome = sched.frame(0.0);
    assert_eq!(
        outcome,
        FrameOutcome::Executed {
            ran: 3,
            skipped: 0,
            errors: 2
        }
    );
    assert_eq!(after.get(), 1);
    assert_eq!(sched.stats().callback_errors, 2);

    let failures: Vec<LoopEvent> = events
        .try_iter()
        .filter(|e| matches!(e, LoopEvent::CallbackFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 2);
    match &failures[0] {
        LoopEvent::CallbackFailed {
            id,
            priority,
            message,
        } => {
            assert_eq!(*id, failing);
            assert_eq!(*priority, Priority::Critical);
            assert!(message.contains("lost the surface"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_deferred_target_change_applies_after_the_tick() {
    let mut sched = AnimationLoopManager::default();
    let seen = Rc::new(Cell::new(0.0_f32));
    {
        let seen = seen.clone();
        sched.register(
            Box::new(move |ctx| {
                ctx.set_target_fps(30.0)?;
                assert!(ctx.set_target_fps(-1.0).is_err());
                seen.set(ctx.fps);
                Ok(())
            }),
            Priority::High,
        );
    }
    sched.frame(0.0);
    assert_eq!(seen.get(), 60.0);
    assert_eq!(sched.target_fps(), 30.0);
    assert_eq!(sched.stats().callback_errors, 0);
}

#[test]
fn test_destroy_clears_everything() {
    let mut sched = AnimationLoopManager::default();
    let hits = Rc::new(Cell::new(0));
    sched.register(counter(&hits), Priority::High);
    sched.frame(0.0);
    sched.destroy();
    assert!(!sched.is_running());
    assert_eq!(sched.callback_count(), 0);
    assert_eq!(sched.frame(100.0), FrameOutcome::Stopped);
    assert_eq!(hits.get(), 1);
}
