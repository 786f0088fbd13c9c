use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::liveness::domain::decision_engine::Verdict;
use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::verdict_sink::VerdictSink;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Configuration for one pipeline run.
pub struct PipelineConfig {
    /// Stop after this many frames.
    pub max_frames: Option<usize>,
    /// Called after every frame with `(frames_done, total_frames)`;
    /// returning `false` cancels the run.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// Outcome of a whole run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LivenessSummary {
    pub frames_read: usize,
    pub face_frames: usize,
    pub windows_completed: usize,
    /// Verdict of the last completed window.
    pub verdict: Verdict,
    pub cancelled: bool,
}

/// Abstracts how the read -> locate -> classify loop is executed.
///
/// The classifier and sink stay with the caller and are only touched from
/// the calling thread, so frames reach them strictly in order whatever the
/// executor does with reading and landmark localization.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        provider: Box<dyn LandmarkProvider>,
        classifier: &mut LivenessClassifier,
        sink: &mut dyn VerdictSink,
        metadata: &VideoMetadata,
        config: PipelineConfig,
    ) -> Result<LivenessSummary, Box<dyn std::error::Error>>;
}
