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

//! Defines the `Rgba` color type used by the drawing surface.

use serde::{Deserialize, Serialize};

/// A straight-alpha color with `f32` components in `[0, 1]`.
///
/// Particles carry their colors as CSS-style hex strings (that is how emotion
/// palettes are authored); the renderer converts them with
/// [`Rgba::from_hex`] right before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
    /// Alpha (opacity) component.
    pub a: f32,
}

impl Rgba {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a color with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    ///
    /// Returns `None` for malformed input instead of guessing.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            3 => {
                let expand = |i: usize| {
                    let c = &hex[i..i + 1];
                    channel(&format!("{c}{c}"))
                };
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Formats the color as `#RRGGBB`, dropping alpha.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// Returns the same color with a different alpha.
    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation towards `other`.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Mixes the color towards white by `amount`.
    #[inline]
    pub fn lighten(self, amount: f32) -> Self {
        self.lerp(Self::WHITE.with_alpha(self.a), amount)
    }

    /// Mixes the color towards black by `amount`.
    #[inline]
    pub fn darken(self, amount: f32) -> Self {
        self.lerp(Self::BLACK.with_alpha(self.a), amount)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_hex_long_and_short_forms() {
        let c = Rgba::from_hex("#FF8000").unwrap();
        assert_relative_eq!(c.r, 1.0);
        assert_relative_eq!(c.g, 128.0 / 255.0);
        assert_relative_eq!(c.b, 0.0);
        assert_relative_eq!(c.a, 1.0);

        let short = Rgba::from_hex("f80").unwrap();
        assert_relative_eq!(short.r, 1.0);
        assert_relative_eq!(short.g, 136.0 / 255.0);

        let with_alpha = Rgba::from_hex("#00000080").unwrap();
        assert_relative_eq!(with_alpha.a, 128.0 / 255.0);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(Rgba::from_hex("").is_none());
        assert!(Rgba::from_hex("#12345").is_none());
        assert!(Rgba::from_hex("#GGHHII").is_none());
        assert!(Rgba::from_hex("#ééé").is_none());
    }

    #[test]
    fn test_hex_round_trip_keeps_rgb() {
        let c = Rgba::from_hex("#4a90e2").unwrap();
        assert_eq!(c.to_hex(), "#4a90e2");
    }

    #[test]
    fn test_lighten_and_darken_preserve_alpha() {
        let c = Rgba::new(0.5, 0.5, 0.5, 0.4);
        let light = c.lighten(1.0);
        assert_relative_eq!(light.r, 1.0);
        assert_relative_eq!(light.a, 0.4);
        let dark = c.darken(1.0);
        assert_relative_eq!(dark.g, 0.0);
        assert_relative_eq!(dark.a, 0.4);
    }
}
