mod progress;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use human_detect_core::detection::domain::class_filter::ClassFilter;
use human_detect_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloLoader, DEFAULT_CONFIDENCE,
};
use human_detect_core::pipeline::detect_humans_use_case::{DetectHumansUseCase, DetectionRequest};
use human_detect_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use human_detect_core::rendering::infrastructure::box_renderer::BoxRenderer;
use human_detect_core::shared::asset_resolver;
use human_detect_core::shared::constants::{
    DEFAULT_MODEL_PATH, DEFAULT_OUTPUT_PATH, LABEL_FONT_NAME, LABEL_FONT_URL,
};
use human_detect_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use human_detect_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

use progress::{download_progress, IndicatifPipelineLogger};

/// Detect people in a video and write an annotated AVI copy.
#[derive(Parser, Debug)]
#[command(name = "detect-humans", version)]
struct Cli {
    /// Input video file.
    filename: PathBuf,

    /// YOLO detection model in ONNX format.
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Output video file (must end in .avi).
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Minimum detection confidence (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Intra-op threads for ONNX Runtime (default: runtime decides).
    #[arg(long)]
    threads: Option<usize>,

    /// TrueType font for box labels (default: downloaded Arial).
    #[arg(long)]
    font: Option<PathBuf>,
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

    let mut loader = OnnxYoloLoader::new(&cli.model, ClassFilter::person())
        .with_confidence(cli.confidence);
    if let Some(threads) = cli.threads {
        loader = loader.with_intra_threads(threads);
    }

    let renderer = build_renderer(cli.font.as_deref())?;
    let logger: Box<dyn PipelineLogger> = if std::io::stderr().is_terminal() {
        Box::new(IndicatifPipelineLogger::new())
    } else {
        Box::new(StdoutPipelineLogger::default())
    };

    let mut use_case = DetectHumansUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        Box::new(loader),
        Box::new(renderer),
        logger,
    );
    let output = use_case.execute(&DetectionRequest::new(cli.filename, cli.output))?;

    println!("Video '{}' created successfully.", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.threads == Some(0) {
        return Err("Threads must be at least 1".into());
    }
    Ok(())
}

/// Label font from `--font`, else the cached or downloaded default.
///
/// A missing default font only disables the labels.
fn build_renderer(font: Option<&Path>) -> Result<BoxRenderer, Box<dyn std::error::Error>> {
    if let Some(path) = font {
        return BoxRenderer::from_font_file(path);
    }

    let (bar, on_progress) = download_progress("Downloading label font");
    let resolved = asset_resolver::resolve(LABEL_FONT_NAME, LABEL_FONT_URL, Some(on_progress))
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|path| BoxRenderer::from_font_file(&path));
    bar.finish_and_clear();

    match resolved {
        Ok(renderer) => Ok(renderer),
        Err(e) => {
            log::warn!("Label font unavailable ({e}); drawing boxes without labels");
            Ok(BoxRenderer::new(None))
        }
    }
}
