use serde::{Deserialize, Serialize};

use crate::liveness::domain::frame_diff::FrameRegionRatio;
use crate::shared::constants::MAX_WINDOW_SIZE;

/// Window-average ratios of one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionAverage {
    pub avg_color_ratio: f64,
    pub avg_brightness_ratio: f64,
}

/// Emitted once per completed window, one average per region in region order.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowEvaluation {
    pub averages: Vec<RegionAverage>,
    pub frames: usize,
}

/// Tumbling (non-overlapping) window over per-frame region ratios.
///
/// Storage is a single preallocated block of `region_count * window_size`
/// slots, region-major. Completing a window rewinds the fill index; no
/// allocation happens after construction.
pub struct WindowAggregator {
    region_count: usize,
    window_size: usize,
    history: Vec<FrameRegionRatio>,
    filled: usize,
}

impl WindowAggregator {
    /// `window_size` is clamped to `1..=MAX_WINDOW_SIZE`; configs are
    /// validated against the same bound before they get here.
    pub fn new(region_count: usize, window_size: usize) -> Self {
        let window_size = window_size.clamp(1, MAX_WINDOW_SIZE);
        Self {
            region_count,
            window_size,
            history: vec![FrameRegionRatio::default(); region_count * window_size],
            filled: 0,
        }
    }

    pub fn region_count(&self) -> usize {
        self.region_count
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Frames accumulated in the current window, always `< window_size`.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Ratios recorded for `region` since the last window completed.
    pub fn history(&self, region: usize) -> &[FrameRegionRatio] {
        if region >= self.region_count {
            return &[];
        }
        let start = region * self.window_size;
        &self.history[start..start + self.filled]
    }

    /// Appends one frame's batch. Returns the evaluation when this frame
    /// completes the window, after which all histories are empty.
    pub fn push(&mut self, batch: &[FrameRegionRatio]) -> Option<WindowEvaluation> {
        debug_assert_eq!(
            batch.len(),
            self.region_count,
            "batch must hold one ratio per region"
        );
        for region in 0..self.region_count {
            let ratio = batch.get(region).copied().unwrap_or_default();
            self.history[region * self.window_size + self.filled] = ratio;
        }
        self.filled += 1;

        if self.filled < self.window_size {
            return None;
        }

        let evaluation = WindowEvaluation {
            averages: (0..self.region_count).map(|r| self.average(r)).collect(),
            frames: self.filled,
        };
        self.reset();
        Some(evaluation)
    }

    /// Drops the in-progress window.
    pub fn reset(&mut self) {
        self.filled = 0;
    }

    fn average(&self, region: usize) -> RegionAverage {
        let window = self.history(region);
        if window.is_empty() {
            return RegionAverage::default();
        }
        let n = window.len() as f64;
        let (color, brightness) = window.iter().fold((0.0, 0.0), |(c, b), r| {
            (c + r.color_ratio, b + r.brightness_ratio)
        });
        RegionAverage {
            avg_color_ratio: color / n,
            avg_brightness_ratio: brightness / n,
        }
    }
}
