use std::time::Instant;

use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::pipeline::classification_loop::ClassificationLoop;
use crate::pipeline::pipeline_executor::{LivenessSummary, PipelineConfig, PipelineExecutor};
use crate::pipeline::verdict_sink::VerdictSink;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Reads, locates and classifies each frame on the calling thread before
/// touching the next one. Lowest latency per frame; no overlap between
/// decoding and landmark inference.
#[derive(Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
    fn execute(
        &self,
        mut reader: Box<dyn VideoReader>,
        mut provider: Box<dyn LandmarkProvider>,
        classifier: &mut LivenessClassifier,
        sink: &mut dyn VerdictSink,
        metadata: &VideoMetadata,
        mut config: PipelineConfig,
    ) -> Result<LivenessSummary, Box<dyn std::error::Error>> {
        let mut run = ClassificationLoop::new(classifier, sink, &mut config, metadata.total_frames);
        let result = drive(&mut *reader, &mut *provider, &mut run);
        reader.close();
        result?;
        Ok(run.finish())
    }
}

fn drive(
    reader: &mut dyn VideoReader,
    provider: &mut dyn LandmarkProvider,
    run: &mut ClassificationLoop<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut frames = reader.frames();
    // Checked before pulling so a live source is not read past the limit.
    while run.wants_more() {
        let Some(frame_result) = frames.next() else {
            break;
        };
        let frame = frame_result?;

        let start = Instant::now();
        let landmarks = provider.locate(&frame)?;
        run.record_timing("landmarks", start.elapsed().as_secs_f64() * 1000.0);

        run.step(&frame, landmarks)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::domain::decision_engine::Verdict;
    use crate::liveness::domain::liveness_config::LivenessConfig;
    use crate::pipeline::test_support::{
        face_metadata, flicker_frames, CenterLandmarks, RecordingSink, StubReader,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn classifier(window_size: usize) -> LivenessClassifier {
        LivenessClassifier::new(LivenessConfig {
            window_size,
            ..LivenessConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_flicker_yields_person() {
        let frames = flicker_frames(11);
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(StubReader::new(frames)),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(11),
                PipelineConfig::default(),
            )
            .unwrap();

        assert_eq!(summary.frames_read, 11);
        assert_eq!(summary.face_frames, 11);
        assert_eq!(summary.windows_completed, 1);
        assert_eq!(summary.verdict, Verdict::Person);
        assert!(!summary.cancelled);
        assert_eq!(sink.frames.len(), 11);
        assert_eq!(sink.windows.len(), 1);
        assert_eq!(sink.frames[10].verdict, Verdict::Person);
        assert_eq!(sink.frames[9].verdict, Verdict::Indeterminate);
    }

    #[test]
    fn test_no_face_frames_reported_without_verdict() {
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(StubReader::new(flicker_frames(5))),
                Box::new(CenterLandmarks::never()),
                &mut c,
                &mut sink,
                &face_metadata(5),
                PipelineConfig::default(),
            )
            .unwrap();
        assert_eq!(summary.face_frames, 0);
        assert_eq!(summary.verdict, Verdict::Indeterminate);
        assert!(sink.frames.iter().all(|u| !u.face_detected));
    }

    #[test]
    fn test_max_frames_limits_run() {
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(StubReader::new(flicker_frames(30))),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(30),
                PipelineConfig {
                    max_frames: Some(7),
                    ..PipelineConfig::default()
                },
            )
            .unwrap();
        assert_eq!(summary.frames_read, 7);
        assert_eq!(sink.frames.len(), 7);
    }

    #[test]
    fn test_stops_pulling_frames_at_limit() {
        let reader = StubReader::new(flicker_frames(30));
        let pulled = reader.pulled.clone();
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        SequentialPipelineExecutor::new()
            .execute(
                Box::new(reader),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(30),
                PipelineConfig {
                    max_frames: Some(7),
                    ..PipelineConfig::default()
                },
            )
            .unwrap();
        assert_eq!(*pulled.lock().unwrap(), 7);
    }

    #[test]
    fn test_stops_pulling_frames_after_cancel() {
        let reader = StubReader::new(flicker_frames(20));
        let pulled = reader.pulled.clone();
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(reader),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(20),
                PipelineConfig {
                    on_progress: Some(Box::new(|done, _| done < 4)),
                    ..PipelineConfig::default()
                },
            )
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(*pulled.lock().unwrap(), 4);
    }

    #[test]
    fn test_progress_callback_cancels() {
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(StubReader::new(flicker_frames(20))),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(20),
                PipelineConfig {
                    on_progress: Some(Box::new(|done, total| {
                        assert_eq!(total, 20);
                        done < 4
                    })),
                    ..PipelineConfig::default()
                },
            )
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames_read, 4);
    }

    #[test]
    fn test_pre_cancelled_reads_nothing() {
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let summary = SequentialPipelineExecutor::new()
            .execute(
                Box::new(StubReader::new(flicker_frames(5))),
                Box::new(CenterLandmarks::always()),
                &mut c,
                &mut sink,
                &face_metadata(5),
                PipelineConfig {
                    cancelled: cancelled.clone(),
                    ..PipelineConfig::default()
                },
            )
            .unwrap();
        assert_eq!(summary.frames_read, 0);
        assert!(cancelled.load(Ordering::Relaxed));
    }

    #[test]
    fn test_reader_error_propagates_and_closes() {
        let reader = StubReader::new(flicker_frames(3)).failing_at(2);
        let closed = reader.closed.clone();
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let result = SequentialPipelineExecutor::new().execute(
            Box::new(reader),
            Box::new(CenterLandmarks::always()),
            &mut c,
            &mut sink,
            &face_metadata(3),
            PipelineConfig::default(),
        );
        assert!(result.is_err());
        assert_eq!(sink.frames.len(), 2);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_provider_error_propagates() {
        let mut c = classifier(10);
        let mut sink = RecordingSink::default();
        let result = SequentialPipelineExecutor::new().execute(
            Box::new(StubReader::new(flicker_frames(3))),
            Box::new(CenterLandmarks::failing()),
            &mut c,
            &mut sink,
            &face_metadata(3),
            PipelineConfig::default(),
        );
        assert!(result.is_err());
    }
}
