use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use lighttrack_core::pipeline::infrastructure::tracking_worker::{
    self, TrackingMessage, TrackingParams,
};
use lighttrack_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use lighttrack_core::shared::bounding_box::BoundingBox;
use lighttrack_core::tracking::domain::track_result::TrackResult;
use lighttrack_core::tracking::domain::tracker_config::{TrackerConfig, TrackerProfile};
use lighttrack_core::video::domain::image_writer::ImageWriter;
use lighttrack_core::video::infrastructure::annotated_image_writer::AnnotatedImageWriter;
use lighttrack_core::video::infrastructure::image_sequence_reader::ImageSequenceReader;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Profile {
    Quality,
    Balanced,
    Speed,
}

impl From<Profile> for TrackerProfile {
    fn from(p: Profile) -> Self {
        match p {
            Profile::Quality => TrackerProfile::Quality,
            Profile::Balanced => TrackerProfile::Balanced,
            Profile::Speed => TrackerProfile::Speed,
        }
    }
}

/// Single-target visual tracking through an image sequence.
#[derive(Parser)]
#[command(name = "lighttrack")]
struct Cli {
    /// Directory of frames (played in file-name order) or a single image.
    frames: PathBuf,

    /// Target box on the first frame: x,y,w,h in pixels.
    #[arg(long)]
    bbox: String,

    /// Speed/accuracy preset.
    #[arg(long, value_enum, default_value = "quality")]
    profile: Profile,

    /// JSON tracker configuration; replaces the profile preset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run full tracking every Nth frame (1 = every frame).
    #[arg(long)]
    skip_frames: Option<usize>,

    /// Processing rate to pace tracked frames to.
    #[arg(long)]
    target_fps: Option<f64>,

    /// Minimum template match score (0.0-1.0, exclusive).
    #[arg(long)]
    confidence: Option<f64>,

    /// Process frames as fast as possible.
    #[arg(long)]
    no_throttle: bool,

    /// Write per-frame results as JSON lines to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write every frame with the tracked box drawn into this directory.
    #[arg(long)]
    annotate: Option<PathBuf>,
}

/// One JSON line of output.
#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    #[serde(flatten)]
    result: &'a TrackResult,
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
    validate(&cli)?;

    let bbox = parse_bbox(&cli.bbox)?;
    let config = build_config(&cli)?;
    config.validate()?;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    let annotations = cli.annotate.clone().map(|dir| {
        let writer: Box<dyn ImageWriter> = Box::new(AnnotatedImageWriter::default());
        (writer, dir)
    });
    let params = TrackingParams {
        input_path: cli.frames.clone(),
        bbox,
        config,
        detector: None,
        reader: Box::new(ImageSequenceReader::new()),
        logger: Box::new(StdoutPipelineLogger::default()),
        annotations,
    };

    let (rx, _cancelled) = tracking_worker::spawn(params);
    for message in rx {
        match message {
            TrackingMessage::Frame { index, result } => {
                let record = FrameRecord {
                    frame: index,
                    result: &result,
                };
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
            }
            TrackingMessage::Complete(report) => {
                out.flush()?;
                log::info!("\n{}", report.stats.report());
                if let Some(path) = &cli.output {
                    log::info!("Results written to {}", path.display());
                }
                if let Some(dir) = &cli.annotate {
                    log::info!("Annotated frames written to {}", dir.display());
                }
                return Ok(());
            }
            TrackingMessage::Error(e) => return Err(e.into()),
            TrackingMessage::Cancelled => return Err("Tracking cancelled".into()),
        }
    }
    Err("Tracking worker exited unexpectedly".into())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frames.exists() {
        return Err(format!("Input not found: {}", cli.frames.display()).into());
    }
    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(format!("Config file not found: {}", path.display()).into());
        }
    }
    if cli.skip_frames == Some(0) {
        return Err("Skip frames must be >= 1".into());
    }
    if let Some(fps) = cli.target_fps {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(format!("Target FPS must be positive, got {fps}").into());
        }
    }
    if let Some(c) = cli.confidence {
        if !(c > 0.0 && c < 1.0) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {c}").into());
        }
    }
    Ok(())
}

fn parse_bbox(text: &str) -> Result<BoundingBox, Box<dyn std::error::Error>> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid --bbox '{text}': {e}"))?;
    let [x, y, w, h] = values[..] else {
        return Err(format!("--bbox needs 4 values x,y,w,h, got {}", values.len()).into());
    };
    let bbox = BoundingBox::new(x, y, w, h);
    if !bbox.is_valid() {
        return Err(format!("--bbox must have positive width and height, got {text}").into());
    }
    Ok(bbox)
}

fn load_config(path: &Path) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| format!("Invalid config {}: {e}", path.display()).into())
}

/// Profile preset (or config file), then explicit flags on top.
fn build_config(cli: &Cli) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::preset(cli.profile.into()),
    };
    if let Some(k) = cli.skip_frames {
        config.skip_interval = k;
    }
    if let Some(fps) = cli.target_fps {
        config.target_fps = fps;
    }
    if let Some(c) = cli.confidence {
        config.confidence_threshold = c;
    }
    if cli.no_throttle {
        config.throttle = false;
    }
    Ok(config)
}
