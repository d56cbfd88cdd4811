use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use facegate_core::detection::domain::face_detector::FaceDetector;
use facegate_core::detection::infrastructure::model_resolver;
use facegate_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facegate_core::pipeline::frame_clock::FrameClock;
use facegate_core::pipeline::kiosk_engine::KioskEngine;
use facegate_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facegate_core::pipeline::run_kiosk_use_case::RunKioskUseCase;
use facegate_core::recognition::domain::gallery_store::GalleryStore;
use facegate_core::recognition::infrastructure::in_memory_gallery_store::InMemoryGalleryStore;
use facegate_core::recognition::infrastructure::sqlite_gallery_store::SqliteGalleryStore;
use facegate_core::rendering::infrastructure::cpu_overlay_renderer::{
    CpuOverlayRenderer, DEFAULT_BANNER_ALPHA,
};
use facegate_core::shared::constants::{DEFAULT_REPLAY_FPS, YOLO_MODEL_NAME, YOLO_MODEL_URL};
use facegate_core::shared::kiosk_config::KioskConfig;
use facegate_core::video::domain::frame_sink::{FrameSink, NullFrameSink};
use facegate_core::video::domain::video_reader::VideoReader;
use facegate_core::video::infrastructure::ffmpeg_reader::{is_capture_device, FfmpegReader};
use facegate_core::video::infrastructure::image_directory_reader::ImageDirectoryReader;
use facegate_core::video::infrastructure::image_sequence_sink::ImageSequenceSink;

/// Event kiosk that registers each visitor once by face.
///
/// Type `q` and Enter to stop.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Camera device (e.g. /dev/video0), video file, or a directory of images to replay.
    source: PathBuf,

    /// JSON config file (default: the platform config dir, if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Player database file.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Keep the gallery in memory; nothing is persisted.
    #[arg(long, conflicts_with = "database")]
    ephemeral: bool,

    /// Save annotated frames as PNG files into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// With --output-dir, keep every Nth frame.
    #[arg(long, default_value = "1")]
    every: usize,

    /// Face detection model (downloaded on first use if omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Maximum feature distance for two sightings to be the same person.
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds a visitor must stay in frame to register.
    #[arg(long)]
    registration_secs: Option<f64>,

    /// Minimum seconds between detection passes.
    #[arg(long)]
    cooldown_secs: Option<f64>,

    /// Seconds a face may go unseen before it is dropped.
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Box smoothing factor (0.0-1.0, lower is smoother).
    #[arg(long)]
    alpha: Option<f64>,

    /// Use wall-clock time even for recorded sources.
    #[arg(long)]
    wall_clock: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Replay rate for image directories.
    #[arg(long, default_value_t = DEFAULT_REPLAY_FPS)]
    fps: f64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut config = KioskConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let mut reader = build_reader(&cli.source, cli.fps);
    let metadata = reader.open(&cli.source)?;
    let clock = if cli.wall_clock {
        FrameClock::wall()
    } else {
        FrameClock::for_source(&metadata, is_capture_device(&cli.source))
    };

    let gallery = open_gallery(&config, cli.ephemeral)?;
    let detector = build_detector(cli.model.as_deref(), config.detector_confidence)?;
    let sink: Box<dyn FrameSink> = match &cli.output_dir {
        Some(dir) => Box::new(ImageSequenceSink::new(dir, cli.every)?),
        None => Box::new(NullFrameSink),
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    spawn_quit_listener(cancelled.clone());
    log::info!("Kiosk running on {}; type q + Enter to stop", cli.source.display());

    let mut use_case = RunKioskUseCase::new(
        reader,
        detector,
        gallery,
        KioskEngine::from_config(&config),
        Box::new(CpuOverlayRenderer::new(DEFAULT_BANNER_ALPHA)?),
        sink,
        Box::new(StdoutPipelineLogger::default()),
        clock,
        metadata.total_frames,
        cli.max_frames,
        None,
        Some(cancelled),
    );
    let summary = use_case.execute()?;

    log::info!(
        "Done: {} frames, {} detection passes, {} identities seen, {} registrations",
        summary.frames,
        summary.detection_cycles,
        summary.identities_seen,
        summary.registrations_committed
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.source.exists() {
        return Err(format!("Source not found: {}", cli.source.display()).into());
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("Replay fps must be positive, got {}", cli.fps).into());
    }
    if cli.every == 0 {
        return Err("--every must be at least 1".into());
    }
    Ok(())
}

/// Command-line values win over the config file.
fn apply_overrides(config: &mut KioskConfig, cli: &Cli) {
    if let Some(v) = cli.threshold {
        config.match_threshold = v;
    }
    if let Some(v) = cli.confidence {
        config.detector_confidence = v;
    }
    if let Some(v) = cli.registration_secs {
        config.registration_duration_secs = v;
    }
    if let Some(v) = cli.cooldown_secs {
        config.detection_cooldown_secs = v;
    }
    if let Some(v) = cli.timeout_secs {
        config.tracking_timeout_secs = v;
    }
    if let Some(v) = cli.alpha {
        config.smoothing_alpha = v;
    }
    if let Some(ref path) = cli.database {
        config.database_path = Some(path.clone());
    }
}

fn build_reader(source: &Path, fps: f64) -> Box<dyn VideoReader> {
    if source.is_dir() {
        Box::new(ImageDirectoryReader::new(fps))
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn open_gallery(
    config: &KioskConfig,
    ephemeral: bool,
) -> Result<Box<dyn GalleryStore>, Box<dyn std::error::Error>> {
    if ephemeral {
        log::info!("Using an in-memory gallery; registrations will not be kept");
        return Ok(Box::new(InMemoryGalleryStore::new()));
    }
    let path = config.resolved_database_path();
    let store = SqliteGalleryStore::open(&path)?;
    log::info!(
        "Player database {} ({} known faces)",
        path.display(),
        store.len()?
    );
    Ok(Box::new(store))
}

fn build_detector(
    model: Option<&Path>,
    confidence: f64,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        model,
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;
    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

/// Raises `cancelled` when the operator types `q`.
fn spawn_quit_listener(cancelled: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().eq_ignore_ascii_case("q") {
                log::info!("Quit requested");
                cancelled.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
