use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::landmarks::domain::face_landmarks::FaceLandmarks;
use crate::landmarks::domain::landmark_provider::LandmarkProvider;
use crate::liveness::domain::liveness_classifier::LivenessClassifier;
use crate::pipeline::classification_loop::ClassificationLoop;
use crate::pipeline::pipeline_executor::{LivenessSummary, PipelineConfig, PipelineExecutor};
use crate::pipeline::verdict_sink::VerdictSink;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// A frame with its landmarks and how long localization took.
type Located = (Frame, Option<FaceLandmarks>, f64);

/// Runs decoding and landmark localization on their own threads.
///
/// Layout: `reader -> landmarks -> caller [classify + sink]`
///
/// Bounded channels keep at most `channel_capacity` frames in flight per
/// stage. The classifier stays on the calling thread, its single consumer,
/// so ordering is the channel order.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            channel_capacity: capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        provider: Box<dyn LandmarkProvider>,
        classifier: &mut LivenessClassifier,
        sink: &mut dyn VerdictSink,
        metadata: &VideoMetadata,
        mut config: PipelineConfig,
    ) -> Result<LivenessSummary, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;
        let cancelled = config.cancelled.clone();
        let limit = config.max_frames.unwrap_or(usize::MAX);

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (located_tx, located_rx) =
            crossbeam_channel::bounded::<Result<Located, SendError>>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, cancelled.clone(), limit);
        let landmark_handle = spawn_landmarks(provider, frame_rx, located_tx, cancelled);

        let mut run = ClassificationLoop::new(classifier, sink, &mut config, metadata.total_frames);
        let main_error = run_main_loop(located_rx, &mut run);

        let joined = join_threads(reader_handle, landmark_handle, main_error);
        let summary = run.finish();
        joined.map(|()| summary)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
    limit: usize,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in reader.frames().take(limit) {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let failed = frame_result.is_err();
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        reader.close();
    })
}

fn spawn_landmarks(
    mut provider: Box<dyn LandmarkProvider>,
    frame_rx: crossbeam_channel::Receiver<Result<Frame, SendError>>,
    located_tx: crossbeam_channel::Sender<Result<Located, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            let result = frame_result.and_then(|frame| {
                let start = Instant::now();
                match provider.locate(&frame) {
                    Ok(landmarks) => {
                        let ms = start.elapsed().as_secs_f64() * 1000.0;
                        Ok((frame, landmarks, ms))
                    }
                    Err(e) => Err(e.to_string().into()),
                }
            });

            let failed = result.is_err();
            if located_tx.send(result).is_err() || failed {
                break;
            }
        }
    })
}

/// Consumes located frames in order until the stream ends, the run is
/// cancelled or the limit is hit. Dropping the receiver on return unblocks
/// the producer threads.
fn run_main_loop(
    located_rx: crossbeam_channel::Receiver<Result<Located, SendError>>,
    run: &mut ClassificationLoop<'_>,
) -> Option<Box<dyn std::error::Error>> {
    while run.wants_more() {
        let Ok(located) = located_rx.recv() else {
            break;
        };
        let (frame, landmarks, landmark_ms) = match located {
            Ok(item) => item,
            Err(e) => return Some(e.to_string().into()),
        };

        run.record_timing("landmarks", landmark_ms);
        run.record_metric("queue_depth", located_rx.len() as f64);
        if let Err(e) = run.step(&frame, landmarks) {
            return Some(e);
        }
    }
    None
}

/// Joins both producer threads and keeps the first error seen.
fn join_threads(
    reader_handle: JoinHandle<()>,
    landmark_handle: JoinHandle<()>,
    mut first_error: Option<Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    if landmark_handle.join().is_err() && first_error.is_none() {
        first_error = Some("Landmark thread panicked".into());
    }
    if reader_handle.join().is_err() && first_error.is_none() {
        first_error = Some("Reader thread panicked".into());
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
