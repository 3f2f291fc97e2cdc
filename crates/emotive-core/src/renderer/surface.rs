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

//! The drawing-surface contract.

use crate::math::{Rgba, Vec2};

/// A 2D immediate-mode drawing target.
///
/// This is the only thing the particle renderer knows about the host: a
/// state stack plus path-and-fill primitives, in the style of a canvas 2D
/// context. Implementations live with the host (a browser canvas, a software
/// rasterizer, or the [`RecordingSurface`](super::RecordingSurface) used for
/// headless runs and tests).
pub trait DrawSurface {
    /// Pushes the current drawing state.
    fn save(&mut self);

    /// Pops the most recently saved drawing state.
    fn restore(&mut self);

    /// Sets the opacity multiplier applied to subsequent fills and strokes.
    fn set_global_alpha(&mut self, alpha: f32);

    /// Sets the color used by [`fill`](DrawSurface::fill).
    fn set_fill_color(&mut self, color: Rgba);

    /// Sets the color used by [`stroke`](DrawSurface::stroke).
    fn set_stroke_color(&mut self, color: Rgba);

    /// Sets the stroke width in pixels.
    fn set_line_width(&mut self, width: f32);

    /// Starts a new path, discarding any pending one.
    fn begin_path(&mut self);

    /// Adds a circular arc to the current path.
    fn arc(&mut self, center: Vec2, radius: f32, start_angle: f32, end_angle: f32);

    /// Fills the current path.
    fn fill(&mut self);

    /// Strokes the current path.
    fn stroke(&mut self);
}
