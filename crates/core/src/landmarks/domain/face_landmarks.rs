//! Dense face landmarks in normalized frame coordinates.
//!
//! `(0.0, 0.0)` is the top-left corner of the frame and `(1.0, 1.0)` the
//! bottom-right. Landmark models may report points slightly outside that
//! range near the image edge; those are kept as-is and resolved by the
//! sampler.

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<(f64, f64)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points inside the unit square.
    pub fn in_frame_count(&self) -> usize {
        self.points
            .iter()
            .filter(|(x, y)| (0.0..1.0).contains(x) && (0.0..1.0).contains(y))
            .count()
    }
}

impl From<Vec<(f64, f64)>> for FaceLandmarks {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points)
    }
}
