use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

pub type Rgb = [u8; 3];

/// Per-landmark colors for one frame, in landmark order.
///
/// A slot is `None` when its landmark fell outside the raster.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorSample {
    colors: Vec<Option<Rgb>>,
}

impl ColorSample {
    pub fn new(colors: Vec<Option<Rgb>>) -> Self {
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color at `index`; `None` when absent or past the end.
    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied().flatten()
    }

    pub fn present_count(&self) -> usize {
        self.colors.iter().filter(|c| c.is_some()).count()
    }
}

/// Reads the pixel under every landmark.
///
/// Normalized coordinates map to pixels with `round(l * extent)`. Points
/// that land outside the frame, or are not finite, become absent slots;
/// landmark models routinely report a few of those near the image edge.
pub struct ColorSampler;

impl ColorSampler {
    pub fn sample(frame: &Frame, landmarks: &FaceLandmarks) -> ColorSample {
        let colors = landmarks
            .points()
            .iter()
            .map(|&(lx, ly)| {
                let x = to_pixel(lx, frame.width())?;
                let y = to_pixel(ly, frame.height())?;
                frame.pixel(x, y)
            })
            .collect();
        ColorSample::new(colors)
    }
}

fn to_pixel(coord: f64, extent: u32) -> Option<u32> {
    if !coord.is_finite() {
        return None;
    }
    let p = (coord * extent as f64).round();
    if p < 0.0 || p >= extent as f64 {
        return None;
    }
    Some(p as u32)
}
