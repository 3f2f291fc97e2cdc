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

//! The adaptive degradation controller.

use crate::analysis::{AnalysisReport, PerformanceAnalyzer, Verdict};
use crate::capability::{panic_message, CapabilityRegistry, CapabilityStatus};
use crate::config::DegradationConfig;
use crate::events::{DegradationEvent, FeatureChangeCause};
use crate::levels::{LevelSelector, LevelTable};
use crate::metrics::PerformanceWindow;
use emotive_core::clock::{Clock, MonotonicClock};
use emotive_core::control::{DegradationLevel, DegradationTarget, Feature, FeatureSet};
use emotive_core::error::{ContractError, ContractResult};
use emotive_core::event::EventBus;
use emotive_core::telemetry::PerformanceSample;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Shared handle to a subsystem driven by the controller.
pub type TargetHandle = Rc<RefCell<dyn DegradationTarget>>;

/// What a performance check did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// No level change.
    None,
    /// Moved one level down the ladder.
    Degraded {
        /// Previous level.
        from: String,
        /// New level.
        to: String,
    },
    /// Reverted the most recent optimization.
    Recovered {
        /// Previous level.
        from: String,
        /// New level.
        to: String,
    },
    /// Performance looks good; a recovery will be applied after the delay if
    /// it stays good.
    RecoveryScheduled {
        /// Time at which recovery may be applied.
        at_ms: f64,
    },
}

/// A recoverable failure captured by
/// [`check_performance_enhanced`](DegradationManager::check_performance_enhanced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    /// Short machine-readable category.
    pub kind: String,
    /// Details.
    pub message: String,
}

/// Structured result of a guarded performance check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    /// `false` when the check failed.
    pub success: bool,
    /// Informational note.
    pub message: Option<String>,
    /// The transition, on success.
    pub transition: Option<Transition>,
    /// The failure, when `success` is false.
    pub error: Option<CheckFailure>,
}

impl CheckResult {
    fn ok(transition: Transition) -> Self {
        Self {
            success: true,
            message: None,
            transition: Some(transition),
            error: None,
        }
    }

    fn skipped(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            transition: Some(Transition::None),
            error: None,
        }
    }

    fn failed(kind: &str, message: String) -> Self {
        Self {
            success: false,
            message: None,
            transition: None,
            error: Some(CheckFailure {
                kind: kind.to_string(),
                message,
            }),
        }
    }
}

/// One automatic level change, kept so recovery can undo it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedOptimization {
    /// Level index before the change.
    pub from: usize,
    /// Level index after the change.
    pub to: usize,
    /// Why it was applied.
    pub reason: String,
    /// When it was applied.
    pub at_ms: f64,
}

/// Serializable snapshot of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationStatus {
    /// Current level with effective features.
    pub level: DegradationLevel,
    /// Position on the ladder.
    pub level_index: usize,
    /// Name of the overriding level, if any.
    pub manual_override: Option<String>,
    /// Features currently available.
    pub available_features: FeatureSet,
    /// Features the user switched off.
    pub user_disabled: FeatureSet,
    /// Poor samples in a row.
    pub consecutive_poor: u32,
    /// When a scheduled recovery may apply.
    pub recovery_at_ms: Option<f64>,
    /// Optimizations that recovery would revert, oldest first.
    pub applied_optimizations: Vec<AppliedOptimization>,
    /// Mean of the fps window.
    pub average_fps: f32,
    /// Latest memory reading was above the threshold.
    pub memory_pressure: bool,
    /// A leak episode is in progress.
    pub leak_detected: bool,
    /// Probe results.
    pub capabilities: BTreeMap<String, CapabilityStatus>,
    /// Checks run.
    pub checks: u64,
    /// Checks that failed.
    pub check_errors: u64,
    /// Times a target panicked while a level was applied.
    pub target_errors: u64,
}

/// Watches performance samples and moves the engine up and down the
/// degradation ladder.
///
/// Moving down needs `poor_sample_threshold` poor samples in a row. Moving
/// back up is scheduled by a single good sample and applied only if
/// performance is still good once `recovery_delay_ms` has passed; any poor
/// sample cancels it.
pub struct DegradationManager {
    config: DegradationConfig,
    levels: LevelTable,
    analyzer: PerformanceAnalyzer,
    window: PerformanceWindow,
    clock: Box<dyn Clock>,
    current: usize,
    manual_override: Option<usize>,
    user_disabled: FeatureSet,
    user_enabled: FeatureSet,
    enhanced: FeatureSet,
    capabilities: CapabilityRegistry,
    consecutive_poor: u32,
    recovery_at: Option<f64>,
    applied: Vec<AppliedOptimization>,
    memory_pressure: bool,
    leak_detected: bool,
    last_verdict: Option<Verdict>,
    checks: u64,
    check_errors: u64,
    target_errors: u64,
    targets: Vec<TargetHandle>,
    events: EventBus<DegradationEvent>,
}

impl DegradationManager {
    /// Creates a controller on the wall clock.
    pub fn new(config: DegradationConfig) -> ContractResult<Self> {
        Self::with_clock(config, Box::new(MonotonicClock::new()))
    }

    /// Creates a controller reading time from `clock`.
    pub fn with_clock(config: DegradationConfig, clock: Box<dyn Clock>) -> ContractResult<Self> {
        let levels = LevelTable::new(config.levels.clone())?;
        Ok(Self {
            analyzer: PerformanceAnalyzer::new(&config),
            window: PerformanceWindow::new(config.fps_window, config.memory_window),
            levels,
            clock,
            current: 0,
            manual_override: None,
            user_disabled: FeatureSet::empty(),
            user_enabled: FeatureSet::empty(),
            enhanced: FeatureSet::empty(),
            capabilities: CapabilityRegistry::new(),
            consecutive_poor: 0,
            recovery_at: None,
            applied: Vec::new(),
            memory_pressure: false,
            leak_detected: false,
            last_verdict: None,
            checks: 0,
            check_errors: 0,
            target_errors: 0,
            targets: Vec::new(),
            events: EventBus::new(),
            config,
        })
    }

    /// Subscribes to controller events.
    pub fn subscribe(&mut self) -> flume::Receiver<DegradationEvent> {
        self.events.subscribe()
    }

    /// Registers a subsystem and applies the current level to it right away.
    pub fn register_target(&mut self, target: TargetHandle) {
        let level = self.current_level();
        let available = self.available_features();
        if !self.apply_to(&target, &level, &available) {
            self.target_errors += 1;
        }
        self.targets.push(target);
    }

    // ── Performance checks ──

    /// Feeds one sample. Invalid samples are caller bugs and are returned as
    /// errors. While a manual override is active the sample is recorded but
    /// no transition happens.
    pub fn check_performance(&mut self, sample: PerformanceSample) -> ContractResult<Transition> {
        sample.validate()?;
        let now = self.clock.now_ms();
        let report = self.record(&sample);

        if self.manual_override.is_some() {
            return Ok(Transition::None);
        }

        let transition = match report.verdict {
            Verdict::Poor => {
                if self.recovery_at.take().is_some() {
                    log::debug!("Degradation: scheduled recovery cancelled by poor sample");
                }
                self.consecutive_poor += 1;
                if self.consecutive_poor >= self.config.poor_sample_threshold
                    && self.current < self.levels.last_index()
                {
                    self.consecutive_poor = 0;
                    let reason = if report.memory_pressure {
                        "memory pressure"
                    } else {
                        "sustained low fps"
                    };
                    self.degrade(reason, now)
                } else {
                    Transition::None
                }
            }
            Verdict::Good => {
                self.consecutive_poor = 0;
                match self.recovery_at {
                    Some(at) if now >= at => {
                        self.recovery_at = None;
                        self.recover()
                    }
                    Some(_) => Transition::None,
                    None if !self.applied.is_empty() => {
                        let at_ms = now + self.config.recovery_delay_ms;
                        self.recovery_at = Some(at_ms);
                        log::debug!("Degradation: recovery scheduled at {at_ms:.0}ms");
                        Transition::RecoveryScheduled { at_ms }
                    }
                    None => Transition::None,
                }
            }
            Verdict::Neutral => {
                self.consecutive_poor = 0;
                Transition::None
            }
        };
        Ok(transition)
    }

    /// Adds a validated sample to the windows and classifies it.
    fn record(&mut self, sample: &PerformanceSample) -> AnalysisReport {
        self.checks += 1;
        self.window.fps.push(sample.fps);
        if let Some(mb) = sample.memory_usage_mb {
            self.window.memory_mb.push(mb);
        }

        let report = self
            .analyzer
            .analyze(sample, self.levels.get(self.current), &self.window);
        for alert in &report.alerts {
            log::trace!("Degradation: {alert}");
        }
        self.track_memory(sample, report.memory_pressure, report.leak_growth_mb);
        self.last_verdict = Some(report.verdict);
        report
    }

    /// Like [`check_performance`](Self::check_performance) but never fails:
    /// errors and panics are captured in the result. While a manual override
    /// is active a valid sample is recorded and the check reports success
    /// without evaluating a transition.
    pub fn check_performance_enhanced(&mut self, sample: PerformanceSample) -> CheckResult {
        if let Some(idx) = self.manual_override {
            if sample.validate().is_ok() {
                self.record(&sample);
            }
            log::trace!(
                "Degradation: check skipped, override '{}'",
                self.levels.get(idx).name
            );
            return CheckResult::skipped("manual override active");
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.check_performance(sample))) {
            Ok(Ok(transition)) => CheckResult::ok(transition),
            Ok(Err(err)) => {
                self.check_errors += 1;
                log::warn!("Degradation: performance check rejected: {err}");
                CheckResult::failed(error_kind(&err), err.to_string())
            }
            Err(payload) => {
                self.check_errors += 1;
                let message = panic_message(payload.as_ref());
                log::error!("Degradation: performance check panicked: {message}");
                CheckResult::failed("panic", message)
            }
        }
    }

    fn track_memory(&mut self, sample: &PerformanceSample, pressure: bool, leak: Option<f32>) {
        if let Some(mb) = sample.memory_usage_mb {
            if pressure && !self.memory_pressure {
                self.events.publish(DegradationEvent::MemoryPressure {
                    usage_mb: mb,
                    threshold_mb: self.config.memory_threshold_mb,
                });
            }
            self.memory_pressure = pressure;
        }
        match leak {
            Some(growth_mb) if !self.leak_detected => {
                self.leak_detected = true;
                log::warn!("Degradation: possible memory leak, +{growth_mb:.1}MB");
                self.events.publish(DegradationEvent::MemoryLeakDetected {
                    growth_mb,
                    samples: self.window.memory_mb.count(),
                });
            }
            Some(_) => {}
            None => self.leak_detected = false,
        }
    }

    // ── Transitions ──

    fn degrade(&mut self, reason: &str, now: f64) -> Transition {
        let from = self.current;
        let to = from + 1;
        self.applied.push(AppliedOptimization {
            from,
            to,
            reason: reason.to_string(),
            at_ms: now,
        });
        self.enhanced = FeatureSet::empty();
        self.move_to(to, reason, FeatureChangeCause::Level);
        Transition::Degraded {
            from: self.levels.get(from).name.clone(),
            to: self.levels.get(to).name.clone(),
        }
    }

    fn recover(&mut self) -> Transition {
        let Some(op) = self.applied.pop() else {
            return Transition::None;
        };
        let from = self.current;
        self.move_to(op.from, "recovered", FeatureChangeCause::Level);
        Transition::Recovered {
            from: self.levels.get(from).name.clone(),
            to: self.levels.get(op.from).name.clone(),
        }
    }

    /// Switches level, pushes the new limits to every target, and publishes
    /// the resulting events.
    fn move_to(&mut self, index: usize, reason: &str, cause: FeatureChangeCause) {
        let before = self.available_features();
        let from = self.current;
        self.current = index;
        if from != index {
            let (from_name, to_name) = (
                self.levels.get(from).name.clone(),
                self.levels.get(index).name.clone(),
            );
            log::info!("Degradation level '{from_name}' -> '{to_name}' ({reason})");
            self.events.publish(DegradationEvent::LevelChanged {
                from: from_name,
                to: to_name,
                reason: reason.to_string(),
            });
        }
        self.publish_feature_diff(before, cause);
        self.apply_to_targets();
    }

    fn publish_feature_diff(&mut self, before: FeatureSet, cause: FeatureChangeCause) {
        let after = self.available_features();
        for feature in before.difference(&after).iter() {
            self.events
                .publish(DegradationEvent::FeatureDisabled { feature, cause });
        }
        for feature in after.difference(&before).iter() {
            self.events
                .publish(DegradationEvent::FeatureEnabled { feature, cause });
        }
    }

    /// Pushes the current level to every target. A target that panics is
    /// logged and counted; the remaining targets still receive the level.
    fn apply_to_targets(&mut self) {
        let level = self.current_level();
        let available = self.available_features();
        let failures = self
            .targets
            .iter()
            .filter(|target| !self.apply_to(target, &level, &available))
            .count();
        self.target_errors += failures as u64;
    }

    /// Returns `false` when the target panicked.
    fn apply_to(
        &self,
        target: &TargetHandle,
        level: &DegradationLevel,
        available: &FeatureSet,
    ) -> bool {
        let Ok(mut t) = target.try_borrow_mut() else {
            log::warn!("Degradation target busy; '{}' not applied", level.name);
            return true;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| t.apply_level(level, available))) {
            Ok(()) => true,
            Err(payload) => {
                log::error!(
                    "Degradation target '{}' panicked applying '{}': {}",
                    t.target_name(),
                    level.name,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }

    // ── Manual control ──

    /// Jumps to a level. Returns `false` for an unknown level or while a
    /// manual override is active. Automatic recovery can later walk back up
    /// from the chosen level one step at a time.
    pub fn set_level(&mut self, selector: impl Into<LevelSelector>) -> bool {
        let selector = selector.into();
        if self.manual_override.is_some() {
            log::debug!("Degradation: set_level({selector}) ignored, override active");
            return false;
        }
        let Some(index) = self.levels.resolve(&selector) else {
            log::warn!("Degradation: unknown level {selector}");
            return false;
        };
        self.clear_automatic_state();
        self.move_to(index, "manual", FeatureChangeCause::Level);
        self.rebuild_applied("manual");
        true
    }

    /// Pins the controller to a level until cleared with `None`. Automatic
    /// checks are bypassed while pinned; once cleared, the pinned level is
    /// treated as applied optimizations that recovery can revert.
    pub fn set_manual_override(&mut self, level: Option<LevelSelector>) -> ContractResult<()> {
        match level {
            Some(selector) => {
                let index = self
                    .levels
                    .resolve(&selector)
                    .ok_or_else(|| ContractError::UnknownLevel(selector.to_string()))?;
                self.manual_override = Some(index);
                self.clear_automatic_state();
                self.move_to(index, "manual override", FeatureChangeCause::Level);
            }
            None => {
                if self.manual_override.take().is_some() {
                    log::info!("Degradation: manual override cleared");
                    self.clear_automatic_state();
                    self.rebuild_applied("manual override");
                }
            }
        }
        Ok(())
    }

    fn clear_automatic_state(&mut self) {
        self.consecutive_poor = 0;
        self.recovery_at = None;
        self.applied.clear();
    }

    /// One step per level between the least degraded level and the current
    /// one, so recovery walks back up from a manually chosen level.
    fn rebuild_applied(&mut self, reason: &str) {
        let at_ms = self.clock.now_ms();
        self.applied = (0..self.current)
            .map(|from| AppliedOptimization {
                from,
                to: from + 1,
                reason: reason.to_string(),
                at_ms,
            })
            .collect();
    }

    /// Switches a feature off regardless of level. Automatic transitions and
    /// progressive enhancement never switch it back on.
    pub fn disable_feature(&mut self, feature: Feature) {
        let before = self.available_features();
        self.user_disabled.insert(feature);
        self.user_enabled.remove(feature);
        self.publish_feature_diff(before, FeatureChangeCause::User);
        self.apply_to_targets();
    }

    /// Clears a user disable and forces the feature on regardless of level.
    /// Capabilities that failed their probe stay unavailable.
    pub fn enable_feature(&mut self, feature: Feature) {
        let before = self.available_features();
        self.user_disabled.remove(feature);
        self.user_enabled.insert(feature);
        self.publish_feature_diff(before, FeatureChangeCause::User);
        self.apply_to_targets();
    }

    /// Whether `feature` can be used right now.
    pub fn is_feature_available(&self, feature: Feature) -> bool {
        self.available_features().contains(feature)
    }

    /// Effective features: level flags plus enhancements and user enables,
    /// minus user disables and failed probes.
    pub fn available_features(&self) -> FeatureSet {
        let mut features = self.levels.get(self.current).features;
        for feature in self.enhanced.iter().chain(self.user_enabled.iter()) {
            features.insert(feature);
        }
        for feature in Feature::ALL {
            let unsupported = self
                .capabilities
                .get(feature.as_str())
                .is_some_and(|status| !status.is_supported());
            if unsupported || self.user_disabled.contains(feature) {
                features.remove(feature);
            }
        }
        features
    }

    // ── Progressive enhancement ──

    /// Runs `probe` once for `name` and caches the answer. Probes named after
    /// a feature gate that feature.
    pub fn test_capability<F>(&mut self, name: &str, probe: F) -> CapabilityStatus
    where
        F: FnOnce() -> anyhow::Result<bool>,
    {
        let before = self.available_features();
        let status = self.capabilities.test(name, probe);
        if before != self.available_features() {
            self.publish_feature_diff(before, FeatureChangeCause::Level);
            self.apply_to_targets();
        }
        status
    }

    /// Re-enables features whose probes passed but which the current level
    /// switched off, provided recent performance is good and memory is not
    /// under pressure. Returns the features switched back on.
    pub fn apply_progressive_enhancement(&mut self) -> Vec<Feature> {
        if !self.performance_allows_enhancement() {
            log::debug!("Degradation: progressive enhancement deferred");
            return Vec::new();
        }
        let before = self.available_features();
        let candidates: Vec<Feature> = self
            .capabilities
            .supported()
            .filter_map(|name| name.parse::<Feature>().ok())
            .filter(|f| !before.contains(*f) && !self.user_disabled.contains(*f))
            .collect();
        if candidates.is_empty() {
            return candidates;
        }
        for feature in &candidates {
            self.enhanced.insert(*feature);
        }
        log::info!("Degradation: progressive enhancement re-enabled {candidates:?}");
        self.publish_feature_diff(before, FeatureChangeCause::Enhancement);
        self.events
            .publish(DegradationEvent::ProgressiveEnhancementApplied {
                features: candidates.clone(),
            });
        self.apply_to_targets();
        candidates
    }

    fn performance_allows_enhancement(&self) -> bool {
        let target = self.levels.get(self.current).target_fps;
        self.window.fps.count() > 0
            && self.window.fps.average() >= target * self.config.good_fps_ratio
            && self.last_verdict == Some(Verdict::Good)
            && !self.memory_pressure
    }

    // ── Queries ──

    /// The current level, with its features replaced by the effective set.
    pub fn current_level(&self) -> DegradationLevel {
        let mut level = self.levels.get(self.current).clone();
        level.features = self.available_features();
        level
    }

    /// Position of the current level on the ladder.
    pub fn level_index(&self) -> usize {
        self.current
    }

    /// `true` while pinned by [`set_manual_override`](Self::set_manual_override).
    pub fn is_manual_override(&self) -> bool {
        self.manual_override.is_some()
    }

    /// The ladder.
    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    /// Snapshot for logging and reporting.
    pub fn degradation_status(&self) -> DegradationStatus {
        DegradationStatus {
            level: self.current_level(),
            level_index: self.current,
            manual_override: self
                .manual_override
                .map(|i| self.levels.get(i).name.clone()),
            available_features: self.available_features(),
            user_disabled: self.user_disabled,
            consecutive_poor: self.consecutive_poor,
            recovery_at_ms: self.recovery_at,
            applied_optimizations: self.applied.clone(),
            average_fps: self.window.fps.average(),
            memory_pressure: self.memory_pressure,
            leak_detected: self.leak_detected,
            capabilities: self.capabilities.results().clone(),
            checks: self.checks,
            check_errors: self.check_errors,
            target_errors: self.target_errors,
        }
    }

    /// Returns to the least degraded level and forgets history, overrides,
    /// user toggles, and applied optimizations. Probe results are kept.
    pub fn reset(&mut self) {
        self.manual_override = None;
        self.user_disabled = FeatureSet::empty();
        self.user_enabled = FeatureSet::empty();
        self.enhanced = FeatureSet::empty();
        self.window.clear();
        self.memory_pressure = false;
        self.leak_detected = false;
        self.last_verdict = None;
        self.clear_automatic_state();
        self.current = 0;
        self.apply_to_targets();
        log::info!("Degradation controller reset");
        self.events.publish(DegradationEvent::Reset);
    }
}

fn error_kind(err: &ContractError) -> &'static str {
    match err {
        ContractError::InvalidSample(_) => "invalid_sample",
        ContractError::UnknownLevel(_) => "unknown_level",
        ContractError::UnknownFeature(_) => "unknown_feature",
        _ => "contract",
    }
}
