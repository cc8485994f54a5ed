pub mod batch;
pub mod capability;
pub mod command;
pub mod convert;
pub mod ffprobe;
pub mod health;
pub mod ladder;
pub mod manifest;
pub mod progress;
pub mod resources;
pub mod validate;

use std::path::PathBuf;

use shelfstream_core::{AccelMode, CompressionLevel, QualityMode, VideoCodec};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("master manifest write failed: {0}")]
    ManifestWrite(String),
    #[error("playlist unreadable: {0}")]
    PlaylistUnreadable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Global conversion configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Root receiving one output subdirectory per title.
    pub output_root: PathBuf,
    pub segment_secs: u32,
    pub codec: VideoCodec,
    pub compression: CompressionLevel,
    /// Constant-quality factor; bitrate-driven when unset.
    pub crf: Option<u8>,
    pub quality_mode: QualityMode,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub accel: AccelMode,
    pub hw_decode: bool,
    pub web_compat: bool,
    /// Allowed drift between source and reconstructed output durations.
    pub tolerance_secs: f64,
    /// Outer batch size; computed from the host when unset.
    pub concurrency: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            output_root: PathBuf::from("hls"),
            segment_secs: 6,
            codec: VideoCodec::H264,
            compression: CompressionLevel::Balanced,
            crf: None,
            quality_mode: QualityMode::Adaptive,
            min_ratio: 0.5,
            max_ratio: 1.1,
            accel: AccelMode::Auto,
            hw_decode: true,
            web_compat: true,
            tolerance_secs: 2.0,
            concurrency: None,
        }
    }
}
