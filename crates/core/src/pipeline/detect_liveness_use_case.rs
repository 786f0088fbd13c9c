use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_executor::{LivenessSummary, PipelineConfig, PipelineExecutor};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::verdict_sink::VerdictSink;

/// Orchestrates one liveness run over a video or frame sequence.
///
/// Wires the reader, landmark provider, classifier and sink together and
/// delegates the loop to a `PipelineExecutor`. Single-use: `execute`
/// consumes the owned components, so a second call fails. The classifier
/// stays readable afterwards through [`DetectLivenessUseCase::classifier`].
pub struct DetectLivenessUseCase {
    reader: Option<Box<dyn VideoReader>>,
    provider: Option<Box<dyn LandmarkProvider>>,
    sink: Option<Box<dyn VerdictSink>>,
    logger: Option<Box<dyn PipelineLogger>>,
    classifier: LivenessClassifier,
    executor: Box<dyn PipelineExecutor>,
    max_frames: Option<usize>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl DetectLivenessUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        provider: Box<dyn LandmarkProvider>,
        classifier: LivenessClassifier,
        sink: Box<dyn VerdictSink>,
        executor: Box<dyn PipelineExecutor>,
        max_frames: Option<usize>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
        logger: Option<Box<dyn PipelineLogger>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            provider: Some(provider),
            sink: Some(sink),
            logger: Some(logger.unwrap_or_else(|| Box::new(NullPipelineLogger))),
            classifier,
            executor,
            max_frames,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn classifier(&self) -> &LivenessClassifier {
        &self.classifier
    }

    /// Runs the pipeline to the end of the input, the frame limit or
    /// cancellation, then flushes the sink.
    ///
    /// The sink is finished even when the run is cancelled, so partial
    /// reports still land. It is not finished when the run fails.
    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
    ) -> Result<LivenessSummary, Box<dyn std::error::Error>> {
        let reader = self.reader.take().ok_or("Pipeline already executed")?;
        let provider = self.provider.take().ok_or("Pipeline already executed")?;
        let mut sink = self.sink.take().ok_or("Pipeline already executed")?;
        let logger = self.logger.take().ok_or("Pipeline already executed")?;

        log::info!("{}", describe_run(&self.classifier, metadata));

        let config = PipelineConfig {
            max_frames: self.max_frames,
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
            logger,
        };

        let summary = self.executor.execute(
            reader,
            provider,
            &mut self.classifier,
            sink.as_mut(),
            metadata,
            config,
        )?;
        sink.finish()?;

        log::info!(
            "Liveness run finished: {} frames, {} with a face, {} windows, verdict {}",
            summary.frames_read,
            summary.face_frames,
            summary.windows_completed,
            summary.verdict
        );
        Ok(summary)
    }
}

/// One-line summary of the classifier setup for the start of a run.
fn describe_run(classifier: &LivenessClassifier, metadata: &VideoMetadata) -> String {
    let (_, window_size) = classifier.window_progress();
    let window = match metadata.window_seconds(window_size) {
        Some(secs) => format!("{window_size} face frames (~{secs:.1}s)"),
        None => format!("{window_size} face frames"),
    };
    let t = classifier.thresholds();
    format!(
        "Classifying {} regions, window {window}, gap policy {:?}, person-like at color {} or brightness {}, {} regions for Person",
        classifier.regions().len(),
        classifier.gap_policy(),
        t.avg_color_ratio,
        t.avg_brightness_ratio,
        t.min_person_regions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::domain::decision_engine::Verdict;
    use crate::liveness::domain::liveness_config::LivenessConfig;
    use crate::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
    use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
    use crate::pipeline::test_support::{
        face_metadata, flicker_frames, CenterLandmarks, SharedSink, StubReader,
    };
    use crate::shared::frame::Frame;
    use rstest::rstest;
    use std::sync::atomic::Ordering;

    fn classifier(window_size: usize) -> LivenessClassifier {
        LivenessClassifier::new(LivenessConfig {
            window_size,
            ..LivenessConfig::default()
        })
        .unwrap()
    }

    fn use_case(
        frames: Vec<Frame>,
        provider: CenterLandmarks,
        sink: SharedSink,
        executor: Box<dyn PipelineExecutor>,
    ) -> DetectLivenessUseCase {
        DetectLivenessUseCase::new(
            Box::new(StubReader::new(frames)),
            Box::new(provider),
            classifier(10),
            Box::new(sink),
            executor,
            None,
            None,
            None,
            None,
        )
    }

    #[rstest]
    #[case::sequential(Box::new(SequentialPipelineExecutor::new()))]
    #[case::threaded(Box::new(ThreadedPipelineExecutor::new()))]
    fn test_flicker_run_is_person(#[case] executor: Box<dyn PipelineExecutor>) {
        let sink = SharedSink::default();
        let mut uc = use_case(
            flicker_frames(21),
            CenterLandmarks::always(),
            sink.clone(),
            executor,
        );

        let summary = uc.execute(&face_metadata(21)).unwrap();

        assert_eq!(summary.verdict, Verdict::Person);
        assert_eq!(summary.windows_completed, 2);
        assert_eq!(uc.classifier().verdict(), Verdict::Person);
        assert_eq!(uc.classifier().windows_completed(), 2);

        let recorded = sink.0.lock().unwrap();
        assert!(recorded.finished);
        assert_eq!(recorded.frames.len(), 21);
        assert_eq!(recorded.windows.len(), 2);
    }

    #[test]
    fn test_static_frames_are_picture() {
        let frames = (0..11)
            .map(|i| Frame::filled(32, 24, [90, 90, 90], i))
            .collect();
        let sink = SharedSink::default();
        let mut uc = use_case(
            frames,
            CenterLandmarks::always(),
            sink.clone(),
            Box::new(SequentialPipelineExecutor::new()),
        );

        let summary = uc.execute(&face_metadata(11)).unwrap();
        assert_eq!(summary.verdict, Verdict::Picture);
    }

    #[test]
    fn test_second_execute_fails() {
        let mut uc = use_case(
            flicker_frames(3),
            CenterLandmarks::always(),
            SharedSink::default(),
            Box::new(SequentialPipelineExecutor::new()),
        );
        uc.execute(&face_metadata(3)).unwrap();

        let err = uc.execute(&face_metadata(3)).unwrap_err();
        assert_eq!(err.to_string(), "Pipeline already executed");
    }

    #[test]
    fn test_cancelled_run_still_finishes_sink() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let sink = SharedSink::default();
        let mut uc = DetectLivenessUseCase::new(
            Box::new(StubReader::new(flicker_frames(30))),
            Box::new(CenterLandmarks::always()),
            classifier(10),
            Box::new(sink.clone()),
            Box::new(SequentialPipelineExecutor::new()),
            None,
            Some(Box::new(move |done, _| {
                if done == 5 {
                    flag.store(true, Ordering::Relaxed);
                }
                true
            })),
            Some(cancelled.clone()),
            None,
        );

        let summary = uc.execute(&face_metadata(30)).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames_read, 5);
        assert!(sink.0.lock().unwrap().finished);
    }

    #[test]
    fn test_failed_run_does_not_finish_sink() {
        let sink = SharedSink::default();
        let mut uc = use_case(
            flicker_frames(3),
            CenterLandmarks::failing(),
            sink.clone(),
            Box::new(SequentialPipelineExecutor::new()),
        );
        assert!(uc.execute(&face_metadata(3)).is_err());
        assert!(!sink.0.lock().unwrap().finished);
    }

    #[test]
    fn test_describe_run_reports_setup() {
        let text = describe_run(&classifier(10), &face_metadata(30));
        assert_eq!(
            text,
            "Classifying 6 regions, window 10 face frames (~0.3s), gap policy CarryPrevious, \
             person-like at color 0.16988 or brightness 0.18, 3 regions for Person"
        );
    }

    #[test]
    fn test_describe_run_without_frame_rate() {
        let mut metadata = face_metadata(30);
        metadata.fps = 0.0;
        let text = describe_run(&classifier(100), &metadata);
        assert!(text.contains("window 100 face frames,"));
    }

    #[test]
    fn test_max_frames_is_forwarded() {
        let sink = SharedSink::default();
        let mut uc = DetectLivenessUseCase::new(
            Box::new(StubReader::new(flicker_frames(30))),
            Box::new(CenterLandmarks::always()),
            classifier(10),
            Box::new(sink.clone()),
            Box::new(SequentialPipelineExecutor::new()),
            Some(12),
            None,
            None,
            None,
        );
        let summary = uc.execute(&face_metadata(30)).unwrap();
        assert_eq!(summary.frames_read, 12);
        assert_eq!(summary.windows_completed, 1);
    }
}
