use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

/// Domain interface for single-face landmark localization.
///
/// `Ok(None)` means no face in this frame, which is a normal outcome.
/// `Err` is reserved for provider failures (model or I/O errors).
/// Implementations may be stateful (e.g. reading a track in frame
/// order), hence `&mut self`.
pub trait LandmarkProvider: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>>;
}
