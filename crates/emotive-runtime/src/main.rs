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

//! Headless Emotive runtime.
//!
//! Loads an engine configuration, drives the engine for a fixed number of
//! host ticks onto a recording surface, and logs the final statistics as
//! JSON. With `--simulated-fps` the ticks are spaced on a virtual clock, which
//! makes degradation behavior reproducible without a real display.

use anyhow::{bail, Context};
use clap::Parser;
use emotive_core::clock::{Clock, ManualClock, MonotonicClock};
use emotive_core::renderer::RecordingSurface;
use emotive_core::telemetry::MemoryProbe;
use emotive_sdk::{Engine, EngineConfig, EngineStats, FrameOutcome};
use emotive_telemetry::{init_logging, MemoryMonitor};
use serde::Serialize;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "emotive-runtime")]
#[command(about = "Runs the Emotive engine headless and reports its statistics", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON engine configuration; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host ticks to run
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Space ticks on a virtual clock at this rate instead of real time
    #[arg(long)]
    simulated_fps: Option<f64>,

    /// Do not attach process memory readings to samples
    #[arg(long)]
    no_memory: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    mode: &'static str,
    frames_requested: u32,
    frames_executed: u32,
    frames_throttled: u32,
    draw_calls: usize,
    state_changes: usize,
    elapsed_ms: f64,
    engine: EngineStats,
}

/// Where tick timestamps come from.
enum TickSource {
    Simulated { clock: ManualClock, spacing_ms: f64 },
    Wall(MonotonicClock),
}

impl TickSource {
    fn from_cli(simulated_fps: Option<f64>) -> anyhow::Result<Self> {
        match simulated_fps {
            Some(fps) if !fps.is_finite() || fps <= 0.0 => {
                bail!("--simulated-fps must be a positive number, got {fps}")
            }
            Some(fps) => Ok(TickSource::Simulated {
                clock: ManualClock::new(0.0),
                spacing_ms: 1000.0 / fps,
            }),
            None => Ok(TickSource::Wall(MonotonicClock::new())),
        }
    }

    fn clock(&self) -> Box<dyn Clock> {
        match self {
            TickSource::Simulated { clock, .. } => Box::new(clock.clone()),
            TickSource::Wall(clock) => Box::new(*clock),
        }
    }

    /// Produces the next tick timestamp, waiting out the frame budget on the
    /// wall clock.
    fn next_tick(&self, budget_ms: f64) -> f64 {
        match self {
            TickSource::Simulated { clock, spacing_ms } => {
                clock.advance(*spacing_ms);
                clock.now_ms()
            }
            TickSource::Wall(clock) => {
                std::thread::sleep(Duration::from_secs_f64(budget_ms / 1000.0));
                clock.now_ms()
            }
        }
    }

    fn now_ms(&self) -> f64 {
        match self {
            TickSource::Simulated { clock, .. } => clock.now_ms(),
            TickSource::Wall(clock) => clock.now_ms(),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            TickSource::Simulated { .. } => "simulated",
            TickSource::Wall(_) => "wall",
        }
    }
}

fn memory_probe(enabled: bool) -> Option<Box<dyn MemoryProbe>> {
    if !enabled {
        return None;
    }
    match MemoryMonitor::new() {
        Ok(monitor) => Some(Box::new(monitor)),
        Err(err) => {
            log::warn!("Memory monitoring unavailable: {err:#}");
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    init_logging(&config.logging);

    let source = TickSource::from_cli(cli.simulated_fps)?;
    let probe = memory_probe(!cli.no_memory);
    let mut engine =
        Engine::with_clock(config, probe, source.clock()).context("Failed to build engine")?;
    let degradation_events = engine.subscribe_degradation();

    let surface = Rc::new(RefCell::new(RecordingSurface::new()));
    engine.install(surface.clone())?;
    log::info!(
        "Running {} frames ({} clock)",
        cli.frames,
        source.mode()
    );

    let started_ms = source.now_ms();
    let (mut executed, mut throttled) = (0, 0);
    let (mut draw_calls, mut state_changes) = (0, 0);
    for _ in 0..cli.frames {
        let now = source.next_tick(engine.scheduler().frame_budget_ms());
        match engine.frame(now) {
            FrameOutcome::Executed { .. } => executed += 1,
            FrameOutcome::Throttled => throttled += 1,
            FrameOutcome::Stopped => {
                log::warn!("Scheduler stopped early");
                break;
            }
        }
        {
            let mut surface = surface.borrow_mut();
            draw_calls += surface.draw_calls();
            state_changes += surface.state_changes();
            surface.clear();
        }
        for event in degradation_events.try_iter() {
            log::info!("Degradation event: {}", event.name());
        }
    }

    let report = RunReport {
        mode: source.mode(),
        frames_requested: cli.frames,
        frames_executed: executed,
        frames_throttled: throttled,
        draw_calls,
        state_changes,
        elapsed_ms: source.now_ms() - started_ms,
        engine: engine.stats(),
    };
    log::info!(
        "Final stats:\n{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
    );
    engine.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "emotive-runtime",
            "--frames",
            "90",
            "--simulated-fps",
            "20",
            "--no-memory",
        ]);
        assert_eq!(cli.frames, 90);
        assert_eq!(cli.simulated_fps, Some(20.0));
        assert!(cli.no_memory);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_simulated_source_spaces_ticks() {
        let source = TickSource::from_cli(Some(50.0)).unwrap();
        assert_eq!(source.next_tick(0.0), 20.0);
        assert_eq!(source.next_tick(0.0), 40.0);
        assert!(TickSource::from_cli(Some(0.0)).is_err());
        assert!(TickSource::from_cli(Some(f64::NAN)).is_err());
    }
}
