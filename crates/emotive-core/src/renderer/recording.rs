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

//! A [`DrawSurface`] that records commands instead of rasterizing them.

use super::DrawSurface;
use crate::math::{Rgba, Vec2};

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// `save()`
    Save,
    /// `restore()`
    Restore,
    /// `set_global_alpha(alpha)`
    GlobalAlpha(f32),
    /// `set_fill_color(color)`
    FillColor(Rgba),
    /// `set_stroke_color(color)`
    StrokeColor(Rgba),
    /// `set_line_width(width)`
    LineWidth(f32),
    /// `begin_path()`
    BeginPath,
    /// `arc(center, radius, start, end)`
    Arc {
        /// Arc center.
        center: Vec2,
        /// Arc radius.
        radius: f32,
    },
    /// `fill()`
    Fill,
    /// `stroke()`
    Stroke,
}

/// Records every call and keeps cheap counters for draw-call and
/// state-change accounting.
///
/// A *state change* is a style call whose value differs from the style that
/// was already current; redundant calls are recorded but not counted.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    draw_calls: usize,
    state_changes: usize,
    current_fill: Option<Rgba>,
    current_stroke: Option<Rgba>,
    current_line_width: Option<f32>,
    depth: usize,
    max_depth: usize,
}

impl RecordingSurface {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands recorded so far, in call order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of `fill` and `stroke` calls.
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Number of fill color, stroke color, and line-width changes.
    pub fn state_changes(&self) -> usize {
        self.state_changes
    }

    /// `true` when every `save` has been matched by a `restore`.
    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }

    /// Deepest save-stack depth observed.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of arcs (circles) added to paths.
    pub fn arc_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Arc { .. }))
            .count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl DrawSurface for RecordingSurface {
    fn save(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            log::warn!("RecordingSurface: restore() without matching save().");
        }
        self.depth = self.depth.saturating_sub(1);
        // Restoring drops whatever style was set inside the saved scope.
        self.current_fill = None;
        self.current_stroke = None;
        self.current_line_width = None;
        self.commands.push(DrawCommand::Restore);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::GlobalAlpha(alpha));
    }

    fn set_fill_color(&mut self, color: Rgba) {
        if self.current_fill != Some(color) {
            self.state_changes += 1;
            self.current_fill = Some(color);
        }
        self.commands.push(DrawCommand::FillColor(color));
    }

    fn set_stroke_color(&mut self, color: Rgba) {
        if self.current_stroke != Some(color) {
            self.state_changes += 1;
            self.current_stroke = Some(color);
        }
        self.commands.push(DrawCommand::StrokeColor(color));
    }

    fn set_line_width(&mut self, width: f32) {
        if self.current_line_width != Some(width) {
            self.state_changes += 1;
            self.current_line_width = Some(width);
        }
        self.commands.push(DrawCommand::LineWidth(width));
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn arc(&mut self, center: Vec2, radius: f32, _start_angle: f32, _end_angle: f32) {
        self.commands.push(DrawCommand::Arc { center, radius });
    }

    fn fill(&mut self) {
        self.draw_calls += 1;
        self.commands.push(DrawCommand::Fill);
    }

    fn stroke(&mut self) {
        self.draw_calls += 1;
        self.commands.push(DrawCommand::Stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redundant_style_calls_are_not_state_changes() {
        let mut surface = RecordingSurface::new();
        surface.set_fill_color(Rgba::WHITE);
        surface.set_fill_color(Rgba::WHITE);
        surface.set_fill_color(Rgba::BLACK);
        surface.set_line_width(2.0);
        surface.set_line_width(2.0);
        assert_eq!(surface.state_changes(), 3);
        assert_eq!(surface.commands().len(), 5);
    }

    #[test]
    fn test_save_restore_balance() {
        let mut surface = RecordingSurface::new();
        surface.save();
        surface.save();
        assert!(!surface.is_balanced());
        surface.restore();
        surface.restore();
        assert!(surface.is_balanced());
        assert_eq!(surface.max_depth(), 2);
    }

    #[test]
    fn test_draw_calls_and_arcs() {
        let mut surface = RecordingSurface::new();
        surface.begin_path();
        surface.arc(Vec2::new(1.0, 1.0), 3.0, 0.0, crate::math::TAU);
        surface.fill();
        surface.stroke();
        assert_eq!(surface.draw_calls(), 2);
        assert_eq!(surface.arc_count(), 1);
        surface.clear();
        assert_eq!(surface.draw_calls(), 0);
    }
}
