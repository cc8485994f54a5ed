//! Batch driver: probe, validation/resume pass, then bounded sequential
//! batches of concurrent jobs.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::Serialize;
use shelfstream_core::AccelMode;
use tracing::{info, warn};

use crate::capability;
use crate::convert::{self, ConversionJob, JobOutcome, JobReport, SourceVideo, build_job};
use crate::ffprobe;
use crate::health::{self, DiskStatus};
use crate::progress::{ProgressEvent, ProgressSender, emit};
use crate::resources;
use crate::validate::{self, TrackMeasure};
use crate::{PipelineConfig, PipelineError};

/// Final per-run summary. Individual failures live in `errors` as flat
/// "video (quality): reason" strings; they never fail the run itself.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub converted: usize,
    pub partial: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Scheduling stopped early (critically low disk space).
    pub halted: bool,
    pub errors: Vec<String>,
}

impl RunReport {
    fn record(&mut self, job: &JobReport) {
        match &job.outcome {
            JobOutcome::Converted => self.converted += 1,
            JobOutcome::PartiallyConverted => self.partial += 1,
            JobOutcome::Failed(reason) => {
                self.failed += 1;
                self.errors.push(format!("{}: {reason}", job.video.display()));
            }
        }
        for (quality, reason) in &job.task_errors {
            self.errors
                .push(format!("{} ({quality}): {reason}", job.video.display()));
        }
    }
}

/// Validation outcome for one video, for validate-only runs.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub video: PathBuf,
    pub output_exists: bool,
    pub aligned: bool,
    pub tracks: Vec<TrackMeasure>,
}

/// Convert every discovered video. The capability probe and concurrency
/// computation run once here; jobs then proceed in sequential batches, each
/// settling fully before the next starts.
pub async fn run(
    cfg: &PipelineConfig,
    paths: Vec<PathBuf>,
    events: Option<&ProgressSender>,
) -> Result<RunReport, PipelineError> {
    let accel = match cfg.accel {
        AccelMode::Auto => capability::detect(&cfg.ffmpeg_path).await,
        AccelMode::Off => None,
        AccelMode::Force(a) => {
            info!(accel = %a, "hardware acceleration forced");
            Some(a)
        }
    };
    let concurrency = cfg.concurrency.unwrap_or_else(resources::detect_concurrency);

    tokio::fs::create_dir_all(&cfg.output_root).await?;

    let mut report = RunReport {
        total: paths.len(),
        ..Default::default()
    };

    let mut videos = Vec::with_capacity(paths.len());
    for path in paths {
        videos.push(probe_source(cfg, path).await);
    }

    // Resume pass, strictly before any conversion is scheduled: aligned
    // output is kept, stale output is deleted and redone ahead of untouched
    // videos.
    let (requeued, fresh, skipped) = triage_existing(cfg, videos, events).await;
    report.skipped = skipped;
    let queue: Vec<SourceVideo> = requeued.into_iter().chain(fresh).collect();

    for (index, chunk) in queue.chunks(concurrency.max(1)).enumerate() {
        match health::disk_status(&cfg.output_root) {
            DiskStatus::Critical => {
                warn!("critically low disk space, halting further scheduling");
                report.halted = true;
                break;
            }
            DiskStatus::Low => warn!("disk space is low"),
            DiskStatus::Ok => {}
        }

        emit(
            events,
            ProgressEvent::BatchStarted {
                index,
                jobs: chunk.len(),
            },
        );

        let jobs = chunk
            .iter()
            .map(|video| convert_one(cfg, accel, video.clone(), events));
        for job_report in join_all(jobs).await {
            report.record(&job_report);
        }
    }

    info!(
        total = report.total,
        converted = report.converted,
        partial = report.partial,
        skipped = report.skipped,
        failed = report.failed,
        "batch run complete"
    );
    Ok(report)
}

/// Plan the jobs a run would execute, without touching the filesystem
/// beyond probing. Used by dry-run previews.
pub async fn plan(cfg: &PipelineConfig, paths: Vec<PathBuf>) -> Vec<ConversionJob> {
    let mut jobs = Vec::with_capacity(paths.len());
    for path in paths {
        let video = probe_source(cfg, path).await;
        jobs.push(build_job(cfg, video));
    }
    jobs
}

/// Classify every existing output directory without deleting or converting
/// anything. Used by validate-only runs.
pub async fn validate_all(cfg: &PipelineConfig, paths: Vec<PathBuf>) -> Vec<ValidationReport> {
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let video = probe_source(cfg, path).await;
        let output_dir = convert::output_dir_for(cfg, &video.path);
        if !output_dir.exists() {
            reports.push(ValidationReport {
                video: video.path,
                output_exists: false,
                aligned: false,
                tracks: Vec::new(),
            });
            continue;
        }
        let result =
            validate::validate_output(video.duration_secs, &output_dir, cfg.tolerance_secs).await;
        reports.push(ValidationReport {
            video: video.path,
            output_exists: true,
            aligned: result.aligned,
            tracks: result.tracks,
        });
    }
    reports
}

/// Probe one source. Unreadable metadata is not fatal: the video still
/// converts with unknown/zero fields, and the ladder fallback covers the
/// missing height.
async fn probe_source(cfg: &PipelineConfig, path: PathBuf) -> SourceVideo {
    let size_bytes = tokio::fs::metadata(&path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    match ffprobe::probe(&cfg.ffprobe_path, &path).await {
        Ok(info) => {
            let (codec, width, height) = info
                .video
                .map(|v| (v.codec, v.width, v.height))
                .unwrap_or_else(|| ("unknown".to_string(), 0, 0));
            SourceVideo {
                path,
                size_bytes,
                duration_secs: info.duration_secs,
                width,
                height,
                codec,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "probe failed, treating metadata as unknown");
            SourceVideo {
                path,
                size_bytes,
                duration_secs: 0.0,
                width: 0,
                height: 0,
                codec: "unknown".to_string(),
            }
        }
    }
}

async fn convert_one(
    cfg: &PipelineConfig,
    accel: Option<shelfstream_core::HwAccel>,
    video: SourceVideo,
    events: Option<&ProgressSender>,
) -> JobReport {
    let job = build_job(cfg, video);
    convert::convert_job(cfg, accel, job, events).await
}

/// Partition probed videos by the state of their existing output: aligned
/// directories are skipped, misaligned ones are deleted wholesale and their
/// videos queued ahead of untouched ones.
async fn triage_existing(
    cfg: &PipelineConfig,
    videos: Vec<SourceVideo>,
    events: Option<&ProgressSender>,
) -> (Vec<SourceVideo>, Vec<SourceVideo>, usize) {
    let mut requeued = Vec::new();
    let mut fresh = Vec::new();
    let mut skipped = 0;

    for video in videos {
        let output_dir = convert::output_dir_for(cfg, &video.path);
        if !output_dir.exists() {
            fresh.push(video);
            continue;
        }

        let result =
            validate::validate_output(video.duration_secs, &output_dir, cfg.tolerance_secs).await;
        if result.aligned {
            info!(video = %video.path.display(), "output aligned, skipping");
            emit(
                events,
                ProgressEvent::JobSkipped {
                    video: video.path.clone(),
                },
            );
            skipped += 1;
        } else {
            warn!(video = %video.path.display(), "output misaligned, re-converting from scratch");
            remove_stale_output(&output_dir).await;
            emit(
                events,
                ProgressEvent::JobRequeued {
                    video: video.path.clone(),
                },
            );
            requeued.push(video);
        }
    }

    (requeued, fresh, skipped)
}

async fn remove_stale_output(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!(path = %dir.display(), error = %e, "could not remove stale output");
    }
}
