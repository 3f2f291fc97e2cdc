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

//! Rendering contracts: the drawing surface and the visible viewport.

mod recording;
mod surface;

pub use self::recording::{DrawCommand, RecordingSurface};
pub use self::surface::DrawSurface;

use crate::math::Vec2;
use serde::{Deserialize, Serialize};

/// The visible area of a drawing surface, in pixels, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Visible width.
    pub width: f32,
    /// Visible height.
    pub height: f32,
}

impl Viewport {
    /// Creates a viewport.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The center point of the viewport.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// `true` if a circle at `position` with `radius` overlaps the viewport
    /// grown by `margin` on every side.
    pub fn overlaps_circle(&self, position: Vec2, radius: f32, margin: f32) -> bool {
        let reach = radius + margin;
        position.x + reach >= 0.0
            && position.y + reach >= 0.0
            && position.x - reach <= self.width
            && position.y - reach <= self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(400.0, 400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps_circle_respects_radius_and_margin() {
        let viewport = Viewport::new(100.0, 100.0);
        assert!(viewport.overlaps_circle(Vec2::new(50.0, 50.0), 1.0, 0.0));
        assert!(!viewport.overlaps_circle(Vec2::new(-20.0, 50.0), 5.0, 0.0));
        assert!(viewport.overlaps_circle(Vec2::new(-20.0, 50.0), 5.0, 20.0));
        assert!(viewport.overlaps_circle(Vec2::new(103.0, 50.0), 5.0, 0.0));
    }

    #[test]
    fn test_center() {
        assert_eq!(Viewport::new(200.0, 100.0).center(), Vec2::new(100.0, 50.0));
    }
}
