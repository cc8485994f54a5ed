pub mod types;

pub use types::{AccelMode, CompressionLevel, HwAccel, Platform, QualityMode, VideoCodec};
