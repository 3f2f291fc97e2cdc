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

//! Cached capability probes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Result of probing one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapabilityStatus {
    /// The probe passed.
    Supported,
    /// The probe returned `false`, failed, or panicked.
    Unsupported {
        /// Why, for logs.
        reason: String,
    },
}

impl CapabilityStatus {
    /// `true` for [`CapabilityStatus::Supported`].
    pub fn is_supported(&self) -> bool {
        matches!(self, CapabilityStatus::Supported)
    }
}

/// Runs each named probe at most once and remembers the answer.
#[derive(Debug, Default, Clone)]
pub struct CapabilityRegistry {
    results: BTreeMap<String, CapabilityStatus>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached status for `name`, running `probe` only the first
    /// time. A failing or panicking probe is recorded as unsupported.
    pub fn test<F>(&mut self, name: &str, probe: F) -> CapabilityStatus
    where
        F: FnOnce() -> anyhow::Result<bool>,
    {
        if let Some(status) = self.results.get(name) {
            return status.clone();
        }
        let status = match panic::catch_unwind(AssertUnwindSafe(probe)) {
            Ok(Ok(true)) => CapabilityStatus::Supported,
            Ok(Ok(false)) => CapabilityStatus::Unsupported {
                reason: "probe reported unsupported".into(),
            },
            Ok(Err(err)) => {
                log::warn!("Capability probe '{name}' failed: {err:#}");
                CapabilityStatus::Unsupported {
                    reason: format!("{err:#}"),
                }
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("Capability probe '{name}' panicked: {reason}");
                CapabilityStatus::Unsupported { reason }
            }
        };
        log::info!("Capability '{name}': {status:?}");
        self.results.insert(name.to_string(), status.clone());
        status
    }

    /// Cached status, if probed.
    pub fn get(&self, name: &str) -> Option<&CapabilityStatus> {
        self.results.get(name)
    }

    /// Names of probes that passed.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, status)| status.is_supported())
            .map(|(name, _)| name.as_str())
    }

    /// Every cached result.
    pub fn results(&self) -> &BTreeMap<String, CapabilityStatus> {
        &self.results
    }
}

/// Best-effort text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_probe_runs_once() {
        let mut registry = CapabilityRegistry::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let status = registry.test("glow", || {
                calls.set(calls.get() + 1);
                Ok(true)
            });
            assert!(status.is_supported());
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(registry.supported().collect::<Vec<_>>(), ["glow"]);
    }

    #[test]
    fn test_failures_are_unsupported() {
        let mut registry = CapabilityRegistry::new();
        assert!(!registry.test("blur", || Ok(false)).is_supported());
        assert!(!registry
            .test("shadows", || Err(anyhow::anyhow!("no offscreen surface")))
            .is_supported());
        let status = registry.test("audio", || panic!("device exploded"));
        assert_eq!(
            status,
            CapabilityStatus::Unsupported {
                reason: "device exploded".into()
            }
        );
        assert_eq!(registry.supported().count(), 0);
    }
}
