use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shelfstream_core::{AccelMode, CompressionLevel, QualityMode, VideoCodec};
use shelfstream_pipeline::progress::ProgressEvent;
use shelfstream_pipeline::{PipelineConfig, batch};

mod report;

/// Convert a media library into adaptive-bitrate HLS output.
#[derive(Debug, Parser)]
#[command(name = "shelfstream", version, about)]
struct Cli {
    /// Library directory to scan for video files.
    library: PathBuf,

    /// Directory receiving converted output, one subdirectory per title.
    /// Falls back to SHELFSTREAM_OUTPUT, then "hls".
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Hardware accelerator: auto, none, nvenc, qsv, vaapi, videotoolbox.
    #[arg(long, default_value = "auto")]
    accel: AccelMode,

    /// Output codec: h264, hevc, av1.
    #[arg(long, default_value = "h264")]
    codec: VideoCodec,

    /// Compression effort: balanced, high, maximum.
    #[arg(long, default_value = "balanced")]
    compression: CompressionLevel,

    /// Constant-quality factor; bitrate-driven encoding when unset.
    #[arg(long)]
    crf: Option<u8>,

    /// Ladder selection: equal, adaptive, adaptive-all.
    #[arg(long, default_value = "adaptive")]
    quality_mode: QualityMode,

    /// Lower bound of the adaptive height window, relative to the source.
    #[arg(long, default_value_t = 0.5)]
    min_ratio: f64,

    /// Upper bound of the adaptive height window, relative to the source.
    #[arg(long, default_value_t = 1.1)]
    max_ratio: f64,

    /// Segment length in seconds.
    #[arg(long, default_value_t = 6)]
    segment_secs: u32,

    /// Allowed drift between source and output durations, in seconds.
    #[arg(long, default_value_t = 2.0)]
    tolerance_secs: f64,

    /// Outer batch size; computed from the host when unset.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Path to the ffmpeg binary; falls back to SHELFSTREAM_FFMPEG, then
    /// PATH.
    #[arg(long)]
    ffmpeg_path: Option<PathBuf>,

    /// Path to the ffprobe binary; falls back to SHELFSTREAM_FFPROBE, then
    /// PATH.
    #[arg(long)]
    ffprobe_path: Option<PathBuf>,

    /// Disable hardware-accelerated decoding.
    #[arg(long)]
    no_hw_decode: bool,

    /// Skip browser-compatibility flags (pixel format, profile/level,
    /// fast-start).
    #[arg(long)]
    no_web_compat: bool,

    /// Print the planned conversions without encoding anything.
    #[arg(long)]
    dry_run: bool,

    /// Classify existing output as aligned/stale and stop; deletes nothing.
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    // Missing binaries are the one fatal startup error.
    let ffmpeg_path = resolve_binary(cli.ffmpeg_path.clone(), "SHELFSTREAM_FFMPEG", "ffmpeg")?;
    let ffprobe_path = resolve_binary(cli.ffprobe_path.clone(), "SHELFSTREAM_FFPROBE", "ffprobe")?;
    info!(ffmpeg = %ffmpeg_path.display(), ffprobe = %ffprobe_path.display(), "binaries resolved");

    let output_root = cli
        .output_dir
        .clone()
        .or_else(|| std::env::var("SHELFSTREAM_OUTPUT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("hls"));

    let cfg = PipelineConfig {
        ffmpeg_path,
        ffprobe_path,
        output_root,
        segment_secs: cli.segment_secs,
        codec: cli.codec,
        compression: cli.compression,
        crf: cli.crf,
        quality_mode: cli.quality_mode,
        min_ratio: cli.min_ratio,
        max_ratio: cli.max_ratio,
        accel: cli.accel,
        hw_decode: !cli.no_hw_decode,
        web_compat: !cli.no_web_compat,
        tolerance_secs: cli.tolerance_secs,
        concurrency: cli.concurrency,
    };

    let entries = shelfstream_scanner::walk_media_dir(&cli.library);
    info!(
        videos = entries.len(),
        library = %cli.library.display(),
        "library scan complete"
    );
    let paths: Vec<PathBuf> = entries.into_iter().map(|e| e.path).collect();

    if cli.dry_run {
        let jobs = batch::plan(&cfg, paths).await;
        report::print_plan(&jobs);
        return Ok(());
    }

    if cli.validate_only {
        let results = batch::validate_all(&cfg, paths).await;
        report::print_validation(&results);
        return Ok(());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let logger = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    let run_report = batch::run(&cfg, paths, Some(&tx)).await?;
    drop(tx);
    let _ = logger.await;

    report::print_report(&run_report);
    // Per-video failures are reported above; only startup errors exit
    // non-zero.
    Ok(())
}

fn resolve_binary(
    overridden: Option<PathBuf>,
    env_var: &str,
    name: &str,
) -> anyhow::Result<PathBuf> {
    let overridden = overridden.or_else(|| std::env::var(env_var).ok().map(PathBuf::from));
    match overridden {
        Some(path) => {
            if path.is_file() {
                Ok(path)
            } else {
                anyhow::bail!("{name} not found at {}", path.display())
            }
        }
        None => which::which(name).with_context(|| format!("{name} not found in PATH")),
    }
}

fn log_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::BatchStarted { index, jobs } => {
            info!(batch = index + 1, jobs, "batch started");
        }
        ProgressEvent::JobSkipped { video } => {
            info!(video = %video.display(), "skipped (aligned)");
        }
        ProgressEvent::JobRequeued { video } => {
            info!(video = %video.display(), "stale output removed, re-queued");
        }
        ProgressEvent::TaskStarted { video, quality } => {
            info!(video = %video.display(), quality, "encoding");
        }
        ProgressEvent::TaskFinished {
            video,
            quality,
            success,
            reason,
        } => {
            if *success {
                info!(video = %video.display(), quality, "quality done");
            } else {
                warn!(
                    video = %video.display(),
                    quality,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "quality failed"
                );
            }
        }
        ProgressEvent::JobFinished {
            video,
            succeeded,
            failed,
        } => {
            info!(video = %video.display(), succeeded, failed, "job finished");
        }
    }
}
