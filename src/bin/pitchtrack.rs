//! `pitchtrack` binary: replay a recorded tracker log through the pipeline.
//!
//! # Usage
//!
//! ```bash
//! pitchtrack --detections match.json --config pitchtrack.json --output tracks.jsonl
//! pitchtrack --detections match.json --history-len 3 --overlay-dir overlays/
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pitchtrack_rs::integration::{
    FrameSnapshot, JsonLinesSink, JsonReplaySource, OverlayRenderer, RenderSink, TrackerPipeline,
};
use pitchtrack_rs::{PipelineConfig, RenderError};

#[derive(Parser, Debug)]
#[command(
    name = "pitchtrack",
    version,
    about = "Smooth tracker output and attach team labels",
    long_about = None
)]
struct Args {
    /// JSON detection log produced by the upstream tracker.
    #[arg(short, long, value_name = "FILE")]
    detections: PathBuf,

    /// JSON pipeline configuration. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write JSON lines here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override `history_len` from the config.
    #[arg(long, allow_negative_numbers = true)]
    history_len: Option<i64>,

    /// Save annotated frames as PNG files into this directory.
    #[arg(long, value_name = "DIR")]
    overlay_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pitchtrack_rs=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(history_len) = args.history_len {
        config.history_len = history_len;
    }
    config.validate().context("invalid configuration")?;

    let source = JsonReplaySource::from_file(&args.detections)
        .and_then(|source| source.with_filter(&config.detector))
        .with_context(|| format!("opening detection log {}", args.detections.display()))?;
    info!(frames = source.remaining(), history_len = config.history_len, "replaying detections");

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating output {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let overlay = args
        .overlay_dir
        .as_ref()
        .map(|dir| OverlayRenderer::new(config.palette_seed).with_output_dir(dir));
    let progress = FrameProgress::new(source.remaining() as u64)?;
    let mut sink = (JsonLinesSink::new(BufWriter::new(writer)), (overlay, progress));

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("installing Ctrl+C handler")?;

    let mut pipeline = TrackerPipeline::new(source, &config)?;
    let result = pipeline.run(&mut sink, &stop);

    let (json, (_, progress)) = sink;
    json.into_inner().flush().context("flushing output")?;
    let summary = result?;

    if summary.interrupted {
        progress.bar.abandon_with_message("interrupted");
        warn!(frames = summary.frames, peak_tracks = summary.peak_tracks, "interrupted, output flushed");
    } else {
        progress.bar.finish_and_clear();
        info!(frames = summary.frames, peak_tracks = summary.peak_tracks, "done");
    }
    Ok(())
}

/// Advances a progress bar once per rendered frame.
struct FrameProgress {
    bar: ProgressBar,
}

impl FrameProgress {
    fn new(frames: u64) -> Result<Self> {
        let bar = ProgressBar::new(frames);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl RenderSink for FrameProgress {
    fn render(&mut self, _snapshot: &FrameSnapshot, _frame: Option<&RgbImage>) -> Result<(), RenderError> {
        self.bar.inc(1);
        Ok(())
    }
}
