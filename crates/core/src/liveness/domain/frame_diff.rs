//! Per-region change ratios between two consecutive color samples.
//!
//! For every landmark of a region that is present in both samples, the
//! color change is the Euclidean RGB distance and the brightness change is
//! the absolute difference of channel means. A landmark counts as changed
//! when the distance reaches (>=) the region's threshold. Ratios are
//! `changed / valid`, or `0.0` when the region has no valid pair, so an
//! occluded region pulls its window average toward zero instead of being
//! skipped.

use serde::{Deserialize, Serialize};

use crate::liveness::domain::color_sampler::{ColorSample, Rgb};
use crate::liveness::domain::facial_region::FacialRegion;

/// Fraction of a region's valid landmark pairs that changed in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRegionRatio {
    pub color_ratio: f64,
    pub brightness_ratio: f64,
}

/// Raw counts behind a [`FrameRegionRatio`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionChangeCounts {
    pub valid: usize,
    pub color_changed: usize,
    pub brightness_changed: usize,
}

impl RegionChangeCounts {
    pub fn ratio(&self) -> FrameRegionRatio {
        if self.valid == 0 {
            return FrameRegionRatio::default();
        }
        let valid = self.valid as f64;
        FrameRegionRatio {
            color_ratio: self.color_changed as f64 / valid,
            brightness_ratio: self.brightness_changed as f64 / valid,
        }
    }
}

/// Stateless comparator of two color samples.
pub struct FrameDiffClassifier;

impl FrameDiffClassifier {
    /// One ratio per region, in region order.
    ///
    /// Returns `None` when the samples differ in length (the landmark
    /// topology changed), which callers treat like having no previous
    /// sample at all.
    pub fn compare(
        previous: &ColorSample,
        current: &ColorSample,
        regions: &[FacialRegion],
    ) -> Option<Vec<FrameRegionRatio>> {
        if previous.len() != current.len() {
            return None;
        }
        Some(
            regions
                .iter()
                .map(|region| Self::count_region(previous, current, region).ratio())
                .collect(),
        )
    }

    pub fn count_region(
        previous: &ColorSample,
        current: &ColorSample,
        region: &FacialRegion,
    ) -> RegionChangeCounts {
        let mut counts = RegionChangeCounts::default();
        for &idx in &region.landmark_indices {
            let (Some(prev), Some(curr)) = (previous.get(idx), current.get(idx)) else {
                continue;
            };
            counts.valid += 1;
            if color_distance(prev, curr) >= region.color_threshold {
                counts.color_changed += 1;
            }
            if (brightness(curr) - brightness(prev)).abs() >= region.brightness_threshold {
                counts.brightness_changed += 1;
            }
        }
        counts
    }
}

pub fn color_distance(a: Rgb, b: Rgb) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

pub fn brightness(c: Rgb) -> f64 {
    (c[0] as f64 + c[1] as f64 + c[2] as f64) / 3.0
}
