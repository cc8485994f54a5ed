//! Duration-alignment validation of existing HLS output.
//!
//! An output directory is trusted only when every quality track the master
//! manifest references reconstructs to the source duration. Anything else is
//! stale and gets redone from scratch.

use std::path::Path;

use serde::Serialize;

use crate::PipelineError;
use crate::manifest;

/// Per-quality measurement reconstructed from a media playlist.
#[derive(Debug, Clone, Serialize)]
pub struct TrackMeasure {
    pub name: String,
    pub duration_secs: f64,
    pub segment_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub aligned: bool,
    pub tracks: Vec<TrackMeasure>,
}

/// Sum of declared segment durations and the segment count.
pub fn parse_media_playlist(text: &str) -> (f64, usize) {
    let mut total = 0.0;
    let mut segments = 0;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            if let Some(duration) = rest
                .split(',')
                .next()
                .and_then(|d| d.trim().parse::<f64>().ok())
            {
                total += duration;
                segments += 1;
            }
        }
    }
    (total, segments)
}

/// Quality playlist paths referenced by a master playlist body.
pub fn parse_master_refs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Measure every quality track the master manifest references. A missing
/// master is an error; a referenced playlist that cannot be read measures
/// as zero, which can never align.
pub async fn measure_output(dir: &Path) -> Result<Vec<TrackMeasure>, PipelineError> {
    let master = dir.join(manifest::MASTER_NAME);
    let text = tokio::fs::read_to_string(&master)
        .await
        .map_err(|e| PipelineError::PlaylistUnreadable(format!("{}: {e}", master.display())))?;

    let mut tracks = Vec::new();
    for rel in parse_master_refs(&text) {
        let name = rel
            .split('/')
            .next()
            .unwrap_or(rel.as_str())
            .to_string();
        let (duration_secs, segment_count) = match tokio::fs::read_to_string(dir.join(&rel)).await
        {
            Ok(playlist) => parse_media_playlist(&playlist),
            Err(_) => (0.0, 0),
        };
        tracks.push(TrackMeasure {
            name,
            duration_secs,
            segment_count,
        });
    }
    Ok(tracks)
}

/// Aligned only when the manifest references at least one track and every
/// track is within tolerance of the source duration. A source whose duration
/// could not be probed falls back to a structural check.
pub fn classify(source_duration: f64, tracks: &[TrackMeasure], tolerance: f64) -> bool {
    if tracks.is_empty() {
        return false;
    }
    if source_duration <= 0.0 {
        return tracks.iter().all(|t| t.segment_count > 0);
    }
    tracks
        .iter()
        .all(|t| (t.duration_secs - source_duration).abs() <= tolerance)
}

/// Validate one existing output directory against its source duration.
pub async fn validate_output(source_duration: f64, dir: &Path, tolerance: f64) -> ValidationResult {
    let tracks = measure_output(dir).await.unwrap_or_default();
    let aligned = classify(source_duration, &tracks, tolerance);
    ValidationResult { aligned, tracks }
}
