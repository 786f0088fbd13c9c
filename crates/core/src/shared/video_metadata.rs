use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// 0 when the source cannot report a frame count (live capture).
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Wall-clock length of one window in seconds, if the rate is known.
    pub fn window_seconds(&self, window_size: usize) -> Option<f64> {
        (self.fps > 0.0).then(|| window_size as f64 / self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metadata(fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            fps,
            total_frames: 300,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/test.mp4")),
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let meta = metadata(30.0);
        let cloned = meta.clone();
        assert_eq!(meta, cloned);
    }

    #[test]
    fn test_window_seconds() {
        assert_relative_eq!(metadata(25.0).window_seconds(100).unwrap(), 4.0);
    }

    #[test]
    fn test_window_seconds_unknown_rate() {
        assert!(metadata(0.0).window_seconds(100).is_none());
    }
}
