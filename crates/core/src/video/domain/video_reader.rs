use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of RGB frames for the liveness pipeline.
///
/// Implementations hide container, codec and device details. Frames come
/// out in capture order with consecutive indices starting at 0.
pub trait VideoReader: Send {
    /// Opens a video file, capture device URL or frame directory.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in capture order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
