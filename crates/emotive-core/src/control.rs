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

//! Types shared between the degradation controller and the subsystems it
//! drives.
//!
//! The controller lives in `emotive-control`; the subsystems it throttles
//! (the particle system, the renderer, the scheduler relay) only depend on the
//! contracts defined here.

use crate::error::ContractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A toggleable engine feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Audio capture and synthesis.
    Audio,
    /// Soft glow halos around particles.
    Glow,
    /// Blur post effects.
    Blur,
    /// Drop shadows.
    Shadows,
    /// Gesture-driven glow/flicker/shimmer overlays.
    GestureOverlays,
    /// Outlined ("cell-shaded") particle style.
    CellShading,
}

impl Feature {
    /// Every feature, in declaration order.
    pub const ALL: [Feature; 6] = [
        Feature::Audio,
        Feature::Glow,
        Feature::Blur,
        Feature::Shadows,
        Feature::GestureOverlays,
        Feature::CellShading,
    ];

    /// The canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Audio => "audio",
            Feature::Glow => "glow",
            Feature::Blur => "blur",
            Feature::Shadows => "shadows",
            Feature::GestureOverlays => "gesture_overlays",
            Feature::CellShading => "cell_shading",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ContractError;

    /// Accepts the canonical name plus the camelCase spellings used by
    /// settings files (`gestureOverlays`, `cellShading`, `glowEffects`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "audio" => Ok(Feature::Audio),
            "glow" | "glowEffects" | "glow_effects" => Ok(Feature::Glow),
            "blur" | "blurEffects" | "blur_effects" => Ok(Feature::Blur),
            "shadows" => Ok(Feature::Shadows),
            "gesture_overlays" | "gestureOverlays" => Ok(Feature::GestureOverlays),
            "cell_shading" | "cellShading" => Ok(Feature::CellShading),
            other => Err(ContractError::UnknownFeature(other.to_string())),
        }
    }
}

/// A compact set of [`Feature`]s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(u8);

impl FeatureSet {
    /// No features.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every feature.
    pub fn all() -> Self {
        Feature::ALL.iter().copied().collect()
    }

    /// `true` if `feature` is in the set.
    pub fn contains(&self, feature: Feature) -> bool {
        self.0 & feature.bit() != 0
    }

    /// Adds `feature`.
    pub fn insert(&mut self, feature: Feature) {
        self.0 |= feature.bit();
    }

    /// Removes `feature`.
    pub fn remove(&mut self, feature: Feature) {
        self.0 &= !feature.bit();
    }

    /// Sets membership of `feature` explicitly.
    pub fn set(&mut self, feature: Feature, enabled: bool) {
        if enabled {
            self.insert(feature);
        } else {
            self.remove(feature);
        }
    }

    /// Features in `self` that are not in `other`.
    pub fn difference(&self, other: &FeatureSet) -> FeatureSet {
        FeatureSet(self.0 & !other.0)
    }

    /// Iterates members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.iter().copied().filter(|f| self.contains(*f))
    }

    /// `true` if no feature is present.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::empty();
        for feature in iter {
            set.insert(feature);
        }
        set
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let features = Vec::<Feature>::deserialize(deserializer)?;
        Ok(features.into_iter().collect())
    }
}

/// One tier of the degradation ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationLevel {
    /// Unique name (`"optimal"`, `"reduced"`, ...).
    pub name: String,
    /// Upper bound on simultaneously live particles.
    pub particle_limit: usize,
    /// Frame rate the scheduler should aim for at this tier.
    pub target_fps: f32,
    /// Features this tier allows.
    pub features: FeatureSet,
}

impl DegradationLevel {
    /// Creates a level.
    pub fn new(
        name: impl Into<String>,
        particle_limit: usize,
        target_fps: f32,
        features: FeatureSet,
    ) -> Self {
        Self {
            name: name.into(),
            particle_limit,
            target_fps,
            features,
        }
    }

    /// Whether this tier keeps audio running.
    pub fn audio_enabled(&self) -> bool {
        self.features.contains(Feature::Audio)
    }
}

/// A subsystem whose operating limits follow the current degradation level.
///
/// The controller calls [`apply_level`](DegradationTarget::apply_level)
/// between ticks, so implementations may assume no simulation step is in
/// progress; the new limits take effect at the next step.
pub trait DegradationTarget {
    /// A short name for logs.
    fn target_name(&self) -> &str;

    /// Applies the limits of `level`. `available` is the effective feature set
    /// after user overrides and capability probes have been folded in.
    fn apply_level(&mut self, level: &DegradationLevel, available: &FeatureSet);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_parsing_accepts_aliases() {
        assert_eq!("glow".parse::<Feature>(), Ok(Feature::Glow));
        assert_eq!("glowEffects".parse::<Feature>(), Ok(Feature::Glow));
        assert_eq!("cellShading".parse::<Feature>(), Ok(Feature::CellShading));
        assert_eq!(
            "sparkles".parse::<Feature>(),
            Err(ContractError::UnknownFeature("sparkles".into()))
        );
    }

    #[test]
    fn test_feature_set_operations() {
        let mut set = FeatureSet::empty();
        assert!(set.is_empty());
        set.insert(Feature::Audio);
        set.insert(Feature::Glow);
        assert!(set.contains(Feature::Glow));
        set.remove(Feature::Glow);
        assert!(!set.contains(Feature::Glow));

        let all = FeatureSet::all();
        let diff = all.difference(&set);
        assert!(!diff.contains(Feature::Audio));
        assert_eq!(diff.iter().count(), Feature::ALL.len() - 1);
    }

    #[test]
    fn test_feature_set_serializes_as_names() {
        let set: FeatureSet = [Feature::Audio, Feature::CellShading].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["audio","cell_shading"]"#);
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_level_audio_flag_follows_features() {
        let level = DegradationLevel::new("emergency", 3, 30.0, FeatureSet::empty());
        assert!(!level.audio_enabled());
        let level = DegradationLevel::new("optimal", 50, 60.0, FeatureSet::all());
        assert!(level.audio_enabled());
    }
}
