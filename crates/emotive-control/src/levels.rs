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

//! The ordered degradation ladder.

use emotive_core::control::{DegradationLevel, Feature, FeatureSet};
use emotive_core::error::{ContractError, ContractResult};
use std::fmt;

/// The built-in ladder: optimal, reduced, minimal, emergency.
pub fn default_levels() -> Vec<DegradationLevel> {
    use Feature::*;
    vec![
        DegradationLevel::new("optimal", 50, 60.0, FeatureSet::all()),
        DegradationLevel::new(
            "reduced",
            25,
            60.0,
            [Audio, Glow, GestureOverlays, CellShading].into_iter().collect(),
        ),
        DegradationLevel::new(
            "minimal",
            10,
            30.0,
            [Audio, GestureOverlays].into_iter().collect(),
        ),
        DegradationLevel::new("emergency", 3, 30.0, FeatureSet::empty()),
    ]
}

/// Picks a level either by name or by position on the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSelector {
    /// Level name, matched case-insensitively.
    Name(String),
    /// Zero-based position, `0` being the least degraded.
    Index(usize),
}

impl From<&str> for LevelSelector {
    fn from(name: &str) -> Self {
        LevelSelector::Name(name.to_string())
    }
}

impl From<String> for LevelSelector {
    fn from(name: String) -> Self {
        LevelSelector::Name(name)
    }
}

impl From<usize> for LevelSelector {
    fn from(index: usize) -> Self {
        LevelSelector::Index(index)
    }
}

impl fmt::Display for LevelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelSelector::Name(name) => f.write_str(name),
            LevelSelector::Index(i) => write!(f, "#{i}"),
        }
    }
}

/// A non-empty ladder of uniquely named levels, least degraded first.
#[derive(Debug, Clone)]
pub struct LevelTable {
    levels: Vec<DegradationLevel>,
}

impl LevelTable {
    /// Validates and wraps `levels`.
    pub fn new(levels: Vec<DegradationLevel>) -> ContractResult<Self> {
        if levels.is_empty() {
            return Err(ContractError::UnknownLevel("<empty level table>".into()));
        }
        for (i, level) in levels.iter().enumerate() {
            if levels[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&level.name))
            {
                return Err(ContractError::UnknownLevel(format!(
                    "duplicate level '{}'",
                    level.name
                )));
            }
        }
        Ok(Self { levels })
    }

    /// Resolves a selector to an index.
    pub fn resolve(&self, selector: &LevelSelector) -> Option<usize> {
        match selector {
            LevelSelector::Name(name) => self
                .levels
                .iter()
                .position(|l| l.name.eq_ignore_ascii_case(name.trim())),
            LevelSelector::Index(i) => (*i < self.levels.len()).then_some(*i),
        }
    }

    /// The level at `index`, clamped to the last one.
    pub fn get(&self, index: usize) -> &DegradationLevel {
        &self.levels[index.min(self.levels.len() - 1)]
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; tables are never empty.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the most degraded level.
    pub fn last_index(&self) -> usize {
        self.levels.len() - 1
    }

    /// All levels in order.
    pub fn iter(&self) -> impl Iterator<Item = &DegradationLevel> {
        self.levels.iter()
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let table = LevelTable::default();
        let names: Vec<&str> = table.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["optimal", "reduced", "minimal", "emergency"]);
        let limits: Vec<usize> = table.iter().map(|l| l.particle_limit).collect();
        assert_eq!(limits, [50, 25, 10, 3]);
        assert!(table.get(2).audio_enabled());
        assert!(!table.get(3).audio_enabled());
    }

    #[test]
    fn test_resolve() {
        let table = LevelTable::default();
        assert_eq!(table.resolve(&"Minimal".into()), Some(2));
        assert_eq!(table.resolve(&3usize.into()), Some(3));
        assert_eq!(table.resolve(&9usize.into()), None);
        assert_eq!(table.resolve(&"turbo".into()), None);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(LevelTable::new(Vec::new()).is_err());
        let dup = vec![
            DegradationLevel::new("a", 1, 60.0, FeatureSet::empty()),
            DegradationLevel::new("A", 1, 60.0, FeatureSet::empty()),
        ];
        assert!(LevelTable::new(dup).is_err());
    }

    #[test]
    fn test_get_clamps() {
        let table = LevelTable::default();
        assert_eq!(table.get(99).name, "emergency");
    }
}
