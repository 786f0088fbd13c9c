use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::liveness::domain::decision_engine::Verdict;
use crate::liveness::domain::liveness_classifier::WindowReport;
use crate::pipeline::verdict_sink::{FrameUpdate, VerdictSink};

/// Document written by [`JsonReportSink`].
#[derive(Debug, Serialize)]
pub struct LivenessReport {
    pub source: Option<PathBuf>,
    pub frames: usize,
    pub face_frames: usize,
    pub final_verdict: Verdict,
    /// Windows evicted by the retention limit, oldest first.
    pub dropped_windows: usize,
    pub windows: VecDeque<WindowReport>,
}

/// Window reports kept for an open-ended source when no limit is given.
/// At 100 face frames per window and 30 fps this covers over an hour.
pub const DEFAULT_LIVE_WINDOW_LIMIT: usize = 1_000;

/// Collects window reports and writes them as one pretty-printed JSON
/// document when the run finishes.
///
/// Unlimited by default, so memory grows with the run. Sources without a
/// known end (capture devices) should set [`JsonReportSink::with_window_limit`],
/// which keeps only the most recent windows and counts the rest in
/// `dropped_windows`.
pub struct JsonReportSink {
    path: PathBuf,
    report: LivenessReport,
    window_limit: Option<usize>,
}

impl JsonReportSink {
    pub fn new(path: &Path, source: Option<PathBuf>) -> Self {
        Self {
            path: path.to_path_buf(),
            report: LivenessReport {
                source,
                frames: 0,
                face_frames: 0,
                final_verdict: Verdict::Indeterminate,
                dropped_windows: 0,
                windows: VecDeque::new(),
            },
            window_limit: None,
        }
    }

    /// Keeps at most `limit` window reports (at least one).
    pub fn with_window_limit(mut self, limit: usize) -> Self {
        self.window_limit = Some(limit.max(1));
        self
    }

    pub fn report(&self) -> &LivenessReport {
        &self.report
    }
}

impl VerdictSink for JsonReportSink {
    fn on_frame(&mut self, update: &FrameUpdate) -> Result<(), Box<dyn std::error::Error>> {
        self.report.frames += 1;
        if update.face_detected {
            self.report.face_frames += 1;
        }
        self.report.final_verdict = update.verdict;
        Ok(())
    }

    fn on_window(&mut self, report: &WindowReport) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(limit) = self.window_limit {
            while self.report.windows.len() >= limit {
                self.report.windows.pop_front();
                self.report.dropped_windows += 1;
            }
        }
        self.report.windows.push_back(report.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)
            .map_err(|e| format!("Cannot create report {}: {e}", self.path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &self.report)?;
        out.flush()?;
        log::info!(
            "Wrote {} window reports to {} ({} older dropped)",
            self.report.windows.len(),
            self.path.display(),
            self.report.dropped_windows
        );
        Ok(())
    }
}
