use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::liveness::domain::liveness_classifier::{FrameOutcome, LivenessClassifier};
use crate::pipeline::pipeline_executor::{LivenessSummary, PipelineConfig};
use crate::pipeline::verdict_sink::{FrameUpdate, VerdictSink};
use crate::shared::frame::Frame;

/// Consumer side shared by all executors: feeds located frames to the
/// classifier, fans results out to the sink and logger, and enforces
/// cancellation and the frame limit.
pub(crate) struct ClassificationLoop<'a> {
    classifier: &'a mut LivenessClassifier,
    sink: &'a mut dyn VerdictSink,
    config: &'a mut PipelineConfig,
    total_frames: usize,
    frames_read: usize,
    face_frames: usize,
    windows_completed: usize,
}

impl<'a> ClassificationLoop<'a> {
    pub fn new(
        classifier: &'a mut LivenessClassifier,
        sink: &'a mut dyn VerdictSink,
        config: &'a mut PipelineConfig,
        total_frames: usize,
    ) -> Self {
        let total_frames = match config.max_frames {
            Some(max) if total_frames == 0 || max < total_frames => max,
            _ => total_frames,
        };
        Self {
            classifier,
            sink,
            config,
            total_frames,
            frames_read: 0,
            face_frames: 0,
            windows_completed: 0,
        }
    }

    /// Whether another frame may be fed.
    pub fn wants_more(&self) -> bool {
        !self.is_cancelled()
            && self
                .config
                .max_frames
                .map_or(true, |max| self.frames_read < max)
    }

    pub fn is_cancelled(&self) -> bool {
        self.config.cancelled.load(Ordering::Relaxed)
    }

    pub fn record_timing(&mut self, stage: &str, duration_ms: f64) {
        self.config.logger.timing(stage, duration_ms);
    }

    pub fn record_metric(&mut self, name: &str, value: f64) {
        self.config.logger.metric(name, value);
    }

    pub fn step(
        &mut self,
        frame: &Frame,
        landmarks: Option<FaceLandmarks>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let face_detected = landmarks.is_some();
        let logger = &mut self.config.logger;
        logger.metric("face_detected", if face_detected { 1.0 } else { 0.0 });
        if let Some(lm) = &landmarks {
            logger.metric("valid_landmarks", lm.in_frame_count() as f64);
        }

        let start = Instant::now();
        let outcome = self.classifier.observe(frame, landmarks.as_ref());
        logger.timing("classify", start.elapsed().as_secs_f64() * 1000.0);

        self.frames_read += 1;
        if face_detected {
            self.face_frames += 1;
        }

        if let FrameOutcome::WindowCompleted(report) = &outcome {
            self.windows_completed += 1;
            self.sink.on_window(report)?;
        }
        self.sink.on_frame(&FrameUpdate {
            frame_index: frame.index(),
            face_detected,
            verdict: self.classifier.verdict(),
        })?;

        self.config.logger.progress(self.frames_read, self.total_frames);
        if let Some(ref callback) = self.config.on_progress {
            if !callback(self.frames_read, self.total_frames) {
                log::info!("Cancelled by progress callback at frame {}", frame.index());
                self.config.cancelled.store(true, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> LivenessSummary {
        let summary = LivenessSummary {
            frames_read: self.frames_read,
            face_frames: self.face_frames,
            windows_completed: self.windows_completed,
            verdict: self.classifier.verdict(),
            cancelled: self.config.cancelled.load(Ordering::Relaxed),
        };
        self.config.logger.summary();
        summary
    }
}
