use crate::liveness::domain::decision_engine::Verdict;
use crate::liveness::domain::liveness_classifier::WindowReport;

/// Per-frame state pushed to sinks, whether or not a window completed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUpdate {
    pub frame_index: usize,
    pub face_detected: bool,
    pub verdict: Verdict,
}

/// Presentation port: receives the live verdict and completed windows.
///
/// Sinks run on the thread that owns the classifier, in frame order.
pub trait VerdictSink: Send {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>>;

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>>;

    /// Called once after the last frame. Default: no-op.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

pub struct NullVerdictSink;

impl VerdictSink for NullVerdictSink {
    fn on_frame(&mut self, _update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn on_window(&mut self, _report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Logs face presence and verdict transitions, not every frame.
#[derive(Default)]
pub struct LogVerdictSink {
    face_present: Option<bool>,
    verdict: Option<Verdict>,
}

impl LogVerdictSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerdictSink for LogVerdictSink {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        if self.face_present != Some(update.face_detected) {
            if update.face_detected {
                log::info!("Frame {}: face detected", update.frame_index);
            } else {
                log::info!("Frame {}: No face detected", update.frame_index);
            }
            self.face_present = Some(update.face_detected);
        }
        if self.verdict != Some(update.verdict) {
            log::info!("Frame {}: Final Result: {}", update.frame_index, update.verdict);
            self.verdict = Some(update.verdict);
        }
        Ok(())
    }

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        for region in &report.regions {
            log::debug!(
                "  {:12} color {:.4}  brightness {:.4}{}",
                region.name,
                region.avg_color_ratio,
                region.avg_brightness_ratio,
                if region.person_like { "  *" } else { "" }
            );
        }
        log::info!(
            "Window {} (ending frame {}): {} with {}/{} person-like regions",
            report.window_index,
            report.end_frame_index,
            report.verdict,
            report.person_like_regions,
            report.regions.len()
        );
        Ok(())
    }
}

/// Forwards every event to each inner sink, in order. Stops at the first error.
pub struct FanoutVerdictSink {
    sinks: Vec<Box<dyn VerdictSink>>,
}

impl FanoutVerdictSink {
    pub fn new(sinks: Vec<Box<dyn VerdictSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl VerdictSink for FanoutVerdictSink {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        self.sinks.iter_mut().try_for_each(|s| s.on_frame(update))
    }

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        self.sinks.iter_mut().try_for_each(|s| s.on_window(report))
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.sinks.iter_mut().try_for_each(|s| s.finish())
    }
}
