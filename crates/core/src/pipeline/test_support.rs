//! In-memory stubs shared by the executor and use-case tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::liveness::domain::liveness_classifier::WindowReport;
use crate::pipeline::verdict_sink::{FrameUpdate, VerdictSink};
use crate::shared::constants::FACE_MESH_LANDMARK_COUNT;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

pub fn face_metadata(total_frames: usize) -> VideoMetadata {
    VideoMetadata {
        width: 32,
        height: 24,
        fps: 30.0,
        total_frames,
        codec: "raw".to_string(),
        source_path: Some(PathBuf::from("stub.mp4")),
    }
}

/// Whole-frame flicker between dark and bright, starting dark.
pub fn flicker_frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let level = if i % 2 == 0 { 30 } else { 220 };
            Frame::filled(32, 24, [level, level, level], i)
        })
        .collect()
}

pub struct StubReader {
    frames: Vec<Frame>,
    fail_at: Option<usize>,
    pub closed: Arc<Mutex<bool>>,
    /// Items handed out by `frames()` so far.
    pub pulled: Arc<Mutex<usize>>,
}

impl StubReader {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            fail_at: None,
            closed: Arc::new(Mutex::new(false)),
            pulled: Arc::new(Mutex::new(0)),
        }
    }

    /// Yields a decode error in place of frame `index` and stops there.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl VideoReader for StubReader {
    fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        Ok(face_metadata(self.frames.len()))
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let fail_at = self.fail_at;
        let pulled = self.pulled.clone();
        Box::new(self.frames.drain(..).enumerate().map_while(move |(i, frame)| {
            let item: Result<Frame, Box<dyn std::error::Error>> = match fail_at {
                Some(f) if i > f => return None,
                Some(f) if i == f => Err("corrupt packet".into()),
                _ => Ok(frame),
            };
            *pulled.lock().unwrap() += 1;
            Some(item)
        }))
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

enum Mode {
    Always,
    Never,
    Failing,
}

/// Reports every landmark at the frame center.
pub struct CenterLandmarks {
    mode: Mode,
}

impl CenterLandmarks {
    pub fn always() -> Self {
        Self { mode: Mode::Always }
    }

    pub fn never() -> Self {
        Self { mode: Mode::Never }
    }

    pub fn failing() -> Self {
        Self { mode: Mode::Failing }
    }
}

impl LandmarkProvider for CenterLandmarks {
    fn locate(&mut self, _frame: &Frame) -> Result<Option<FaceLandmarks>, Box<dyn std::error::Error>> {
        match self.mode {
            Mode::Always => Ok(Some(FaceLandmarks::new(vec![
                (0.5, 0.5);
                FACE_MESH_LANDMARK_COUNT
            ]))),
            Mode::Never => Ok(None),
            Mode::Failing => Err("model crashed".into()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<FrameUpdate>,
    pub windows: Vec<WindowReport>,
    pub finished: bool,
}

impl VerdictSink for RecordingSink {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        self.frames.push(*update);
        Ok(())
    }

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        self.windows.push(report.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.finished = true;
        Ok(())
    }
}

/// [`RecordingSink`] behind a shared handle, for code that takes the sink by value.
#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<RecordingSink>>);

impl VerdictSink for SharedSink {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        self.0.lock().unwrap().on_frame(update)
    }

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        self.0.lock().unwrap().on_window(report)
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.0.lock().unwrap().finish()
    }
}
