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

//! Rolling storage for performance samples.

use std::collections::VecDeque;

/// A bounded window of the most recent samples.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    data: VecDeque<f32>,
    capacity: usize,
}

impl RollingWindow {
    /// Creates an empty window holding at most `capacity` samples (at least
    /// one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a new value, evicting the oldest if full.
    pub fn push(&mut self, value: f32) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    /// Number of stored samples.
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Maximum number of stored samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once `capacity` samples have been seen.
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.data.iter()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f32> {
        self.data.back().copied()
    }

    /// Drops every sample.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Arithmetic mean, `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Mean of the newer half minus mean of the older half. Positive when the
    /// series is rising.
    pub fn trend(&self) -> f32 {
        let count = self.data.len();
        if count < 2 {
            return 0.0;
        }
        let half = count / 2;
        let older: f32 = self.data.iter().take(half).sum::<f32>() / half as f32;
        let newer: f32 = self.data.iter().skip(count - half).sum::<f32>() / half as f32;
        newer - older
    }

    /// Population variance.
    pub fn variance(&self) -> f32 {
        if self.data.len() < 2 {
            return 0.0;
        }
        let avg = self.average();
        let sum_sq: f32 = self.data.iter().map(|v| (v - avg) * (v - avg)).sum();
        sum_sq / self.data.len() as f32
    }

    /// Smallest value, `f32::MAX` when empty.
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::MAX, f32::min)
    }

    /// Largest value, `f32::MIN` when empty.
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::MIN, f32::max)
    }

    /// `true` when every sample is at least the one before it.
    pub fn is_non_decreasing(&self) -> bool {
        self.data
            .iter()
            .zip(self.data.iter().skip(1))
            .all(|(a, b)| b >= a)
    }

    /// Newest minus oldest, `0.0` with fewer than two samples.
    pub fn growth(&self) -> f32 {
        match (self.data.front(), self.data.back()) {
            (Some(first), Some(last)) if self.data.len() >= 2 => last - first,
            _ => 0.0,
        }
    }
}

/// Rolling fps and memory history fed by performance checks.
#[derive(Debug, Clone)]
pub struct PerformanceWindow {
    /// Frames per second.
    pub fps: RollingWindow,
    /// Resident memory in megabytes.
    pub memory_mb: RollingWindow,
}

impl PerformanceWindow {
    /// Creates empty windows.
    pub fn new(fps_capacity: usize, memory_capacity: usize) -> Self {
        Self {
            fps: RollingWindow::new(fps_capacity),
            memory_mb: RollingWindow::new(memory_capacity),
        }
    }

    /// Drops all history.
    pub fn clear(&mut self) {
        self.fps.clear();
        self.memory_mb.clear();
    }
}
