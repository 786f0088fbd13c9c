use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use pad_liveness_core::landmarks::domain::landmark_provider::LandmarkProvider;
use pad_liveness_core::landmarks::infrastructure::jsonl_landmark_provider::JsonlLandmarkProvider;
use pad_liveness_core::landmarks::infrastructure::onnx_face_mesh_provider::{
    InputRange, OnnxFaceMeshProvider, DEFAULT_MIN_FACE_SCORE,
};
use pad_liveness_core::liveness::domain::liveness_classifier::LivenessClassifier;
use pad_liveness_core::liveness::domain::liveness_config::{GapPolicy, LivenessConfig};
use pad_liveness_core::liveness::infrastructure::config_file;
use pad_liveness_core::pipeline::detect_liveness_use_case::DetectLivenessUseCase;
use pad_liveness_core::pipeline::infrastructure::json_report_sink::{
    JsonReportSink, DEFAULT_LIVE_WINDOW_LIMIT,
};
use pad_liveness_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use pad_liveness_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use pad_liveness_core::pipeline::pipeline_executor::PipelineExecutor;
use pad_liveness_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use pad_liveness_core::pipeline::verdict_sink::{FanoutVerdictSink, LogVerdictSink, VerdictSink};
use pad_liveness_core::video::domain::video_reader::VideoReader;
use pad_liveness_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use pad_liveness_core::video::infrastructure::image_sequence_reader::{
    is_image_file, ImageSequenceReader,
};

/// Passive face liveness detection for videos and frame sequences.
#[derive(Parser)]
#[command(name = "pad-liveness")]
struct Cli {
    /// Input video, capture device, frame directory or single image.
    input: Option<PathBuf>,

    /// Landmark track (JSON lines, one entry per frame).
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Face-mesh ONNX model used to locate landmarks.
    #[arg(long)]
    mesh_model: Option<PathBuf>,

    /// Minimum face-presence score for the mesh model (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_FACE_SCORE)]
    min_face_score: f32,

    /// Mesh model expects pixels in [-1, 1] instead of [0, 1].
    #[arg(long)]
    symmetric_input: bool,

    /// JSON config file (defaults to the per-user config, then built-ins).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the built-in config as JSON and exit.
    #[arg(long)]
    print_default_config: bool,

    /// Write the effective config (after overrides) to this path.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Face frames per decision window.
    #[arg(long)]
    window_size: Option<usize>,

    /// Gap policy for frames without a face: carry or discard.
    #[arg(long)]
    gap_policy: Option<String>,

    /// Average color-change ratio a region needs to count as live.
    #[arg(long)]
    avg_color_ratio: Option<f64>,

    /// Average brightness-change ratio a region needs to count as live.
    #[arg(long)]
    avg_brightness_ratio: Option<f64>,

    /// Live regions needed for a Person verdict.
    #[arg(long)]
    min_person_regions: Option<usize>,

    /// Write per-window reports to this JSON file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Keep only the most recent N window reports. Defaults to 1000 for
    /// sources without a known length, unlimited otherwise.
    #[arg(long)]
    report_window_limit: Option<usize>,

    /// Decode and locate landmarks on background threads.
    #[arg(long)]
    threaded: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Frame rate reported for image sequences.
    #[arg(long, default_value = "30.0")]
    fps: f64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_default_config {
        println!("{}", serde_json::to_string_pretty(&LivenessConfig::default())?);
        return Ok(());
    }

    validate(&cli)?;

    let mut config = config_file::load_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli)?;
    config.validate()?;

    if let Some(path) = &cli.save_config {
        config_file::save(&config, path)?;
        log::info!("Config written to {}", path.display());
    }

    let Some(input) = cli.input.as_deref() else {
        return Ok(());
    };

    let classifier = LivenessClassifier::new(config)?;
    let provider = build_provider(&cli)?;
    let mut reader = open_reader(input, cli.fps);
    let metadata = reader.open(input)?;
    log::info!(
        "{}: {}x{} @ {:.1} fps, {} frames",
        input.display(),
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.total_frames
    );

    let mut sinks: Vec<Box<dyn VerdictSink>> = vec![Box::new(LogVerdictSink::new())];
    if let Some(report) = &cli.report {
        let mut sink = JsonReportSink::new(report, Some(input.to_path_buf()));
        if let Some(limit) = report_window_limit(cli.report_window_limit, metadata.total_frames) {
            sink = sink.with_window_limit(limit);
        }
        sinks.push(Box::new(sink));
    }

    let executor: Box<dyn PipelineExecutor> = if cli.threaded {
        Box::new(ThreadedPipelineExecutor::new())
    } else {
        Box::new(SequentialPipelineExecutor::new())
    };

    let mut use_case = DetectLivenessUseCase::new(
        reader,
        provider,
        classifier,
        Box::new(FanoutVerdictSink::new(sinks)),
        executor,
        cli.max_frames,
        None,
        None,
        Some(Box::new(StdoutPipelineLogger::default())),
    );
    let summary = use_case.execute(&metadata)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(report) = &cli.report {
        log::info!("Report written to {}", report.display());
    }
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.input.is_none() && cli.save_config.is_none() {
        return Err("An input is required unless --save-config or --print-default-config is used".into());
    }
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
        match (&cli.landmarks, &cli.mesh_model) {
            (Some(_), Some(_)) => {
                return Err("--landmarks and --mesh-model are mutually exclusive".into())
            }
            (None, None) => {
                return Err("One of --landmarks or --mesh-model is required".into())
            }
            _ => {}
        }
    }
    for path in [&cli.landmarks, &cli.mesh_model, &cli.config].into_iter().flatten() {
        if !path.is_file() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.min_face_score) {
        return Err(format!(
            "Minimum face score must be between 0.0 and 1.0, got {}",
            cli.min_face_score
        )
        .into());
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn apply_overrides(config: &mut LivenessConfig, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(size) = cli.window_size {
        config.window_size = size;
    }
    if let Some(policy) = &cli.gap_policy {
        config.gap_policy = parse_gap_policy(policy)?;
    }
    if let Some(ratio) = cli.avg_color_ratio {
        config.decision.avg_color_ratio = ratio;
    }
    if let Some(ratio) = cli.avg_brightness_ratio {
        config.decision.avg_brightness_ratio = ratio;
    }
    if let Some(count) = cli.min_person_regions {
        config.decision.min_person_regions = count;
    }
    Ok(())
}

fn parse_gap_policy(policy: &str) -> Result<GapPolicy, Box<dyn std::error::Error>> {
    match policy {
        "carry" | "carry_previous" => Ok(GapPolicy::CarryPrevious),
        "discard" | "discard_previous" => Ok(GapPolicy::DiscardPrevious),
        other => Err(format!("Unknown gap policy '{other}', expected carry or discard").into()),
    }
}

/// A source reporting zero frames has no known end, so its report is bounded.
fn report_window_limit(requested: Option<usize>, total_frames: usize) -> Option<usize> {
    match requested {
        Some(limit) => Some(limit),
        None if total_frames == 0 => Some(DEFAULT_LIVE_WINDOW_LIMIT),
        None => None,
    }
}

fn build_provider(cli: &Cli) -> Result<Box<dyn LandmarkProvider>, Box<dyn std::error::Error>> {
    if let Some(track) = &cli.landmarks {
        log::info!("Reading landmark track {}", track.display());
        return Ok(Box::new(JsonlLandmarkProvider::open(track)?));
    }
    let model = cli
        .mesh_model
        .as_deref()
        .ok_or("One of --landmarks or --mesh-model is required")?;
    log::info!("Loading face-mesh model {}", model.display());
    let mut provider = OnnxFaceMeshProvider::new(model, cli.min_face_score)?;
    if cli.symmetric_input {
        provider = provider.with_input_range(InputRange::Symmetric);
    }
    Ok(Box::new(provider))
}

fn open_reader(input: &Path, fps: f64) -> Box<dyn VideoReader> {
    if input.is_dir() || is_image_file(input) {
        Box::new(ImageSequenceReader::new().with_fps(fps))
    } else {
        Box::new(FfmpegReader::new())
    }
}
