//! Per-job conversion: one concurrent encoder invocation per quality.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::future::join_all;
use serde::Serialize;
use shelfstream_core::{HwAccel, QualityMode};
use tokio::process::Command;
use tracing::{info, warn};

use crate::command::{EncodeSpec, build_args};
use crate::ladder::{self, QualityProfile};
use crate::manifest::{self, ManifestEntry};
use crate::progress::{ProgressEvent, ProgressSender, emit};
use crate::{PipelineConfig, PipelineError};

/// A video as discovered and probed. Immutable for the rest of the run;
/// unreadable metadata shows up as zeroes.
#[derive(Debug, Clone)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// Terminal per-task state. No retries within a run; the validation pass on
/// the next run is the only corrective path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskOutcome {
    Pending,
    Succeeded,
    Failed(String),
}

/// One (video, quality) encode with its derived output paths.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    pub profile: QualityProfile,
    pub quality_dir: PathBuf,
    pub playlist_path: PathBuf,
    pub segment_pattern: PathBuf,
    pub outcome: TaskOutcome,
}

/// One video plus the qualities selected for it.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub video: SourceVideo,
    pub output_dir: PathBuf,
    pub tasks: Vec<ConversionTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    Converted,
    PartiallyConverted,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub video: PathBuf,
    pub outcome: JobOutcome,
    /// Flat (quality, reason) pairs for every failed task.
    pub task_errors: Vec<(String, String)>,
}

/// Output directory for one source video: a subdirectory of the output root
/// named after the file stem.
pub fn output_dir_for(cfg: &PipelineConfig, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    cfg.output_root.join(stem)
}

/// Build the job for one source: selected qualities plus derived paths.
pub fn build_job(cfg: &PipelineConfig, video: SourceVideo) -> ConversionJob {
    let output_dir = output_dir_for(cfg, &video.path);
    let profiles = ladder::select_qualities(
        video.height,
        cfg.quality_mode,
        cfg.min_ratio,
        cfg.max_ratio,
    );
    let tasks = profiles
        .into_iter()
        .map(|profile| {
            let quality_dir = output_dir.join(profile.name);
            ConversionTask {
                playlist_path: quality_dir.join("index.m3u8"),
                segment_pattern: quality_dir.join("seg_%05d.ts"),
                quality_dir,
                profile,
                outcome: TaskOutcome::Pending,
            }
        })
        .collect();
    ConversionJob {
        video,
        output_dir,
        tasks,
    }
}

/// Run all of a job's quality encodes concurrently, then assemble the master
/// manifest from the succeeded ones. Task failures are isolated; a manifest
/// write failure fails the whole job.
pub async fn convert_job(
    cfg: &PipelineConfig,
    accel: Option<HwAccel>,
    mut job: ConversionJob,
    events: Option<&ProgressSender>,
) -> JobReport {
    info!(
        video = %job.video.path.display(),
        qualities = job.tasks.len(),
        "starting conversion"
    );

    let runs = job
        .tasks
        .iter()
        .map(|task| run_task(cfg, accel, &job.video, task, events));
    let outcomes = join_all(runs).await;
    for (task, outcome) in job.tasks.iter_mut().zip(outcomes) {
        task.outcome = outcome;
    }

    let succeeded: Vec<ManifestEntry> = job
        .tasks
        .iter()
        .filter(|t| t.outcome == TaskOutcome::Succeeded)
        .map(|t| ManifestEntry {
            profile: t.profile,
            playlist_rel: format!("{}/index.m3u8", t.profile.name),
        })
        .collect();
    let task_errors: Vec<(String, String)> = job
        .tasks
        .iter()
        .filter_map(|t| match &t.outcome {
            TaskOutcome::Failed(reason) => Some((t.profile.name.to_string(), reason.clone())),
            _ => None,
        })
        .collect();

    let master = job.output_dir.join(manifest::MASTER_NAME);
    let body = manifest::render_master(&succeeded, cfg.codec);
    let outcome = match manifest::write_master(&master, &body).await {
        Err(e) => {
            warn!(video = %job.video.path.display(), error = %e, "job failed");
            JobOutcome::Failed(format!("master manifest: {e}"))
        }
        Ok(()) if task_errors.is_empty() => JobOutcome::Converted,
        Ok(()) if !succeeded.is_empty() => JobOutcome::PartiallyConverted,
        Ok(()) => JobOutcome::Failed("all quality tracks failed".into()),
    };

    emit(
        events,
        ProgressEvent::JobFinished {
            video: job.video.path.clone(),
            succeeded: succeeded.len(),
            failed: task_errors.len(),
        },
    );

    JobReport {
        video: job.video.path.clone(),
        outcome,
        task_errors,
    }
}

async fn run_task(
    cfg: &PipelineConfig,
    accel: Option<HwAccel>,
    video: &SourceVideo,
    task: &ConversionTask,
    events: Option<&ProgressSender>,
) -> TaskOutcome {
    emit(
        events,
        ProgressEvent::TaskStarted {
            video: video.path.clone(),
            quality: task.profile.name,
        },
    );

    let outcome = match encode_quality(cfg, accel, video, task).await {
        Ok(()) => TaskOutcome::Succeeded,
        Err(reason) => {
            warn!(
                video = %video.path.display(),
                quality = task.profile.name,
                reason = %reason,
                "quality encode failed"
            );
            TaskOutcome::Failed(reason)
        }
    };

    emit(
        events,
        ProgressEvent::TaskFinished {
            video: video.path.clone(),
            quality: task.profile.name,
            success: outcome == TaskOutcome::Succeeded,
            reason: match &outcome {
                TaskOutcome::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
        },
    );
    outcome
}

/// One encoder invocation. Any failure comes back as a reason string; the
/// caller turns it into the task's terminal outcome.
async fn encode_quality(
    cfg: &PipelineConfig,
    accel: Option<HwAccel>,
    video: &SourceVideo,
    task: &ConversionTask,
) -> Result<(), String> {
    tokio::fs::create_dir_all(&task.quality_dir)
        .await
        .map_err(|e| format!("create {}: {e}", task.quality_dir.display()))?;

    let spec = EncodeSpec {
        accel,
        hw_decode: cfg.hw_decode,
        codec: cfg.codec,
        compression: cfg.compression,
        crf: cfg.crf,
        adaptive: cfg.quality_mode != QualityMode::Equal,
        web_compat: cfg.web_compat,
        segment_secs: cfg.segment_secs,
        profile: &task.profile,
        input: &video.path,
        playlist: &task.playlist_path,
        segment_pattern: &task.segment_pattern,
    };
    let args = build_args(&spec);

    let log_path = task.quality_dir.join("encode.log");
    let log_file = std::fs::File::create(&log_path).map_err(|e| format!("create log: {e}"))?;

    let status = Command::new(&cfg.ffmpeg_path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(log_file))
        .status()
        .await
        .map_err(|e| format!("spawn encoder: {e}"))?;

    if !status.success() {
        return Err(format!("encoder exited with {status}: {}", log_tail(&log_path)));
    }
    // The encoder can exit zero without producing output when the input has
    // no usable streams.
    if !task.playlist_path.exists() {
        return Err("no quality playlist produced".into());
    }
    Ok(())
}

/// Last non-empty line of the encoder log, for failure reasons.
fn log_tail(path: &Path) -> String {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| {
            s.lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "no encoder output".into())
}
