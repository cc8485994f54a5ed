use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Media information extracted via ffprobe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub video: Option<VideoStream>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

/// Run ffprobe on a file and parse the JSON output.
pub async fn probe(ffprobe_path: &Path, file: &Path) -> Result<MediaInfo, PipelineError> {
    let output = tokio::process::Command::new(ffprobe_path)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(file)
        .output()
        .await
        .map_err(|e| PipelineError::ProbeFailed(format!("spawn failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::ProbeFailed(stderr.into_owned()));
    }

    let raw: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| PipelineError::ProbeFailed(format!("parse JSON: {e}")))?;

    parse_probe_output(&raw)
}

fn parse_probe_output(raw: &serde_json::Value) -> Result<MediaInfo, PipelineError> {
    let format = raw
        .get("format")
        .ok_or_else(|| PipelineError::ProbeFailed("missing 'format'".into()))?;

    let duration_secs: f64 = format
        .get("duration")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    let streams = raw
        .get("streams")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut video = None;
    for s in &streams {
        let codec_type = s.get("codec_type").and_then(|v| v.as_str()).unwrap_or("");
        if codec_type == "video" && video.is_none() {
            let codec = s
                .get("codec_name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let width = s.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let height = s.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            video = Some(VideoStream {
                codec,
                width,
                height,
            });
        }
    }

    Ok(MediaInfo {
        duration_secs,
        video,
    })
}
