//! Stateful frame-by-frame liveness classifier.
//!
//! Owns every piece of mutable state the pipeline needs: the retained
//! color sample of the previous face frame, the window histories and the
//! live verdict. Feeding it frames in order is the whole contract; it does
//! no I/O and can be driven from any executor as long as a single owner
//! calls it.

use serde::Serialize;

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::liveness::domain::color_sampler::{ColorSample, ColorSampler};
use crate::liveness::domain::decision_engine::{
    Decision, DecisionEngine, DecisionThresholds, Verdict,
};
use crate::liveness::domain::facial_region::FacialRegion;
use crate::liveness::domain::frame_diff::FrameDiffClassifier;
use crate::liveness::domain::liveness_config::{ConfigError, GapPolicy, LivenessConfig};
use crate::liveness::domain::window_aggregator::{WindowAggregator, WindowEvaluation};
use crate::shared::frame::Frame;

/// Per-region line of a [`WindowReport`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegionReport {
    pub name: String,
    pub avg_color_ratio: f64,
    pub avg_brightness_ratio: f64,
    pub person_like: bool,
}

/// Everything known about one completed window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowReport {
    pub window_index: usize,
    pub end_frame_index: usize,
    pub frames: usize,
    pub verdict: Verdict,
    pub person_like_regions: usize,
    pub regions: Vec<RegionReport>,
}

/// What a single frame did to the classifier.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No face; nothing sampled or accumulated.
    NoFace,
    /// Face sampled, but there was no comparable previous sample.
    Primed,
    /// Ratios appended; `filled` frames in the current window.
    Accumulated { filled: usize },
    /// This frame completed a window and produced a new verdict.
    WindowCompleted(WindowReport),
}

pub struct LivenessClassifier {
    regions: Vec<FacialRegion>,
    gap_policy: GapPolicy,
    previous: Option<ColorSample>,
    aggregator: WindowAggregator,
    engine: DecisionEngine,
    windows_completed: usize,
}

impl LivenessClassifier {
    pub fn new(config: LivenessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let aggregator = WindowAggregator::new(config.regions.len(), config.window_size);
        Ok(Self {
            regions: config.regions,
            gap_policy: config.gap_policy,
            previous: None,
            aggregator,
            engine: DecisionEngine::new(config.decision),
            windows_completed: 0,
        })
    }

    pub fn regions(&self) -> &[FacialRegion] {
        &self.regions
    }

    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    pub fn thresholds(&self) -> &DecisionThresholds {
        self.engine.thresholds()
    }

    /// The live verdict; only changes when a window completes.
    pub fn verdict(&self) -> Verdict {
        self.engine.verdict()
    }

    pub fn windows_completed(&self) -> usize {
        self.windows_completed
    }

    /// `(filled, window_size)` of the in-progress window.
    pub fn window_progress(&self) -> (usize, usize) {
        (self.aggregator.filled(), self.aggregator.window_size())
    }

    pub fn aggregator(&self) -> &WindowAggregator {
        &self.aggregator
    }

    pub fn has_previous_sample(&self) -> bool {
        self.previous.is_some()
    }

    /// Samples the frame under `landmarks` (if any) and advances the state.
    pub fn observe(&mut self, frame: &Frame, landmarks: Option<&FaceLandmarks>) -> FrameOutcome {
        let sample = landmarks.map(|lm| ColorSampler::sample(frame, lm));
        self.observe_sample(sample, frame.index())
    }

    /// Advances the state with an already-sampled frame.
    pub fn observe_sample(&mut self, sample: Option<ColorSample>, frame_index: usize) -> FrameOutcome {
        let Some(current) = sample else {
            if self.gap_policy == GapPolicy::DiscardPrevious {
                self.previous = None;
            }
            return FrameOutcome::NoFace;
        };

        let outcome = match self.previous.take() {
            None => FrameOutcome::Primed,
            Some(previous) => {
                match FrameDiffClassifier::compare(&previous, &current, &self.regions) {
                    None => {
                        log::debug!(
                            "Frame {frame_index}: landmark count changed ({} -> {}), skipping diff",
                            previous.len(),
                            current.len()
                        );
                        FrameOutcome::Primed
                    }
                    Some(batch) => match self.aggregator.push(&batch) {
                        None => FrameOutcome::Accumulated {
                            filled: self.aggregator.filled(),
                        },
                        Some(evaluation) => {
                            FrameOutcome::WindowCompleted(self.complete_window(&evaluation, frame_index))
                        }
                    },
                }
            }
        };

        self.previous = Some(current);
        outcome
    }

    /// Forgets the previous sample, the partial window and the verdict.
    pub fn reset(&mut self) {
        self.previous = None;
        self.aggregator.reset();
        self.engine.reset();
        self.windows_completed = 0;
    }

    fn complete_window(&mut self, evaluation: &WindowEvaluation, frame_index: usize) -> WindowReport {
        let Decision {
            verdict,
            person_like,
        } = self.engine.decide(evaluation);

        let regions: Vec<RegionReport> = self
            .regions
            .iter()
            .zip(&evaluation.averages)
            .zip(&person_like)
            .map(|((region, avg), &flag)| RegionReport {
                name: region.name.clone(),
                avg_color_ratio: avg.avg_color_ratio,
                avg_brightness_ratio: avg.avg_brightness_ratio,
                person_like: flag,
            })
            .collect();

        let report = WindowReport {
            window_index: self.windows_completed,
            end_frame_index: frame_index,
            frames: evaluation.frames,
            verdict,
            person_like_regions: person_like.iter().filter(|&&f| f).count(),
            regions,
        };
        self.windows_completed += 1;

        log::debug!(
            "Window {} complete at frame {frame_index}: {verdict} ({}/{} regions person-like)",
            report.window_index,
            report.person_like_regions,
            self.regions.len()
        );
        report
    }
}
