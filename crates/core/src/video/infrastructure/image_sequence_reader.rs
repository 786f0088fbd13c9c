use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Reads a directory of still frames (or a single image) as a video.
///
/// Files with a known image extension are taken in lexicographic file-name
/// order, so zero-padded names (`frame_0001.png`, ...) come out in capture
/// order. Frames are decoded lazily with the `image` crate. Every frame must
/// match the size of the first one.
pub struct ImageSequenceReader {
    fps: f64,
    paths: Vec<PathBuf>,
    size: Option<(u32, u32)>,
}

impl ImageSequenceReader {
    pub fn new() -> Self {
        Self {
            fps: 0.0,
            paths: Vec::new(),
            size: None,
        }
    }

    /// Frame rate to report in the metadata; sequences carry none of their own.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn decode(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("{}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            list_images(path)?
        } else if is_image_file(path) && path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(format!("{} is neither a frame directory nor an image", path.display()).into());
        };

        let first = paths
            .first()
            .ok_or_else(|| format!("No image frames found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        let metadata = VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: paths.len(),
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened image sequence {} ({} frames, {width}x{height})",
            path.display(),
            paths.len()
        );

        self.paths = paths;
        self.size = Some((width, height));
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(expected) = self.size else {
            return Box::new(std::iter::once(Err("ImageSequenceReader: not opened".into())));
        };

        Box::new(self.paths.iter().enumerate().map(move |(index, path)| {
            let frame = decode(path, index)?;
            if (frame.width(), frame.height()) != expected {
                return Err(format!(
                    "{}: frame is {}x{}, sequence is {}x{}",
                    path.display(),
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                )
                .into());
            }
            Ok(frame)
        }))
    }

    fn close(&mut self) {
        self.paths.clear();
        self.size = None;
    }
}
