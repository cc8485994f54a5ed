use serde::{Deserialize, Serialize};

/// Hardware encode/decode accelerator. At most one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwAccel {
    Nvenc,
    Qsv,
    Vaapi,
    VideoToolbox,
}

impl HwAccel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nvenc => "nvenc",
            Self::Qsv => "qsv",
            Self::Vaapi => "vaapi",
            Self::VideoToolbox => "videotoolbox",
        }
    }
}

impl std::fmt::Display for HwAccel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the accelerator is chosen: probed, disabled, or forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelMode {
    Auto,
    Off,
    Force(HwAccel),
}

impl std::str::FromStr for AccelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" | "off" | "cpu" => Ok(Self::Off),
            "nvenc" | "cuda" => Ok(Self::Force(HwAccel::Nvenc)),
            "qsv" => Ok(Self::Force(HwAccel::Qsv)),
            "vaapi" => Ok(Self::Force(HwAccel::Vaapi)),
            "videotoolbox" => Ok(Self::Force(HwAccel::VideoToolbox)),
            other => Err(format!("unknown accelerator: {other}")),
        }
    }
}

/// Output video codec preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264,
    Hevc,
    Av1,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Av1 => "av1",
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(Self::H264),
            "hevc" | "h265" => Ok(Self::Hevc),
            "av1" => Ok(Self::Av1),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

/// Encoder effort level, mapped to a preset/tuning pair per encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    Balanced,
    High,
    Maximum,
}

impl CompressionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::High => "high",
            Self::Maximum => "maximum",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            "maximum" | "max" => Ok(Self::Maximum),
            other => Err(format!("unknown compression level: {other}")),
        }
    }
}

/// How the quality ladder is narrowed for a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    /// Single rung closest to the source resolution.
    Equal,
    /// Rungs within a ratio window of the source height.
    Adaptive,
    /// The whole ladder.
    AdaptiveAll,
}

impl QualityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Adaptive => "adaptive",
            Self::AdaptiveAll => "adaptive_all",
        }
    }
}

impl std::fmt::Display for QualityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equal" | "equal-quality" => Ok(Self::Equal),
            "adaptive" => Ok(Self::Adaptive),
            "adaptive-all" | "all" => Ok(Self::AdaptiveAll),
            other => Err(format!("unknown quality mode: {other}")),
        }
    }
}

/// Host platform class, used for concurrency ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accel_mode_parsing() {
        assert_eq!("auto".parse::<AccelMode>(), Ok(AccelMode::Auto));
        assert_eq!("none".parse::<AccelMode>(), Ok(AccelMode::Off));
        assert_eq!(
            "NVENC".parse::<AccelMode>(),
            Ok(AccelMode::Force(HwAccel::Nvenc))
        );
        assert!("metal".parse::<AccelMode>().is_err());
    }

    #[test]
    fn codec_parsing_aliases() {
        assert_eq!("h265".parse::<VideoCodec>(), Ok(VideoCodec::Hevc));
        assert_eq!("AVC".parse::<VideoCodec>(), Ok(VideoCodec::H264));
    }

    #[test]
    fn quality_mode_round_trip() {
        for mode in [QualityMode::Equal, QualityMode::Adaptive, QualityMode::AdaptiveAll] {
            let s = mode.as_str().replace('_', "-");
            assert_eq!(s.parse::<QualityMode>(), Ok(mode));
        }
    }
}
