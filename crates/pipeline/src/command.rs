//! Encoder invocation construction.
//!
//! Pure mapping from (capability, codec preference, compression settings,
//! quality profile) to an ffmpeg argument list. Nothing here spawns a
//! process, so the whole decision table is testable without an encoder.

use std::path::Path;

use shelfstream_core::{CompressionLevel, HwAccel, VideoCodec};

use crate::ladder::QualityProfile;

/// Keyframe spacing assumes this frame rate; segments split cleanly only
/// when the GOP length matches `segment_secs * fps`.
const ASSUMED_FPS: u32 = 30;

/// Everything needed to build one per-quality encoder invocation.
#[derive(Debug, Clone, Copy)]
pub struct EncodeSpec<'a> {
    pub accel: Option<HwAccel>,
    pub hw_decode: bool,
    pub codec: VideoCodec,
    pub compression: CompressionLevel,
    pub crf: Option<u8>,
    /// Adds rate caps so adaptive streams stay within their advertised
    /// bandwidth.
    pub adaptive: bool,
    pub web_compat: bool,
    pub segment_secs: u32,
    pub profile: &'a QualityProfile,
    pub input: &'a Path,
    pub playlist: &'a Path,
    pub segment_pattern: &'a Path,
}

/// Build the full argument list for one quality encode. Total: every input
/// combination yields a valid invocation, with hardware flags ahead of the
/// input and the quality playlist as the final argument.
pub fn build_args(spec: &EncodeSpec) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
    ];

    // Decode acceleration must precede the input or ffmpeg rejects it. The
    // VAAPI device is named unconditionally so the encode-side upload can
    // find it even with software decoding.
    if let Some(accel) = spec.accel {
        if accel == HwAccel::Vaapi {
            args.extend(["-vaapi_device".into(), "/dev/dri/renderD128".into()]);
        }
        if spec.hw_decode {
            args.extend(decode_flags(accel).iter().map(|s| (*s).to_string()));
        }
    }

    args.extend(["-i".into(), spec.input.to_string_lossy().into_owned()]);

    let encode_accel = encode_accel(spec.codec, spec.accel);
    let encoder = encoder_name(spec.codec, spec.accel);
    args.extend(["-c:v".into(), encoder.into()]);
    args.extend(["-vf".into(), scale_filter(spec)]);

    // Rate control: constant quality when a CRF is set, plain bitrate
    // otherwise.
    match spec.crf {
        Some(crf) => args.extend(quality_args(encode_accel, crf)),
        None => args.extend(["-b:v".into(), format!("{}k", spec.profile.video_kbps)]),
    }
    if spec.adaptive {
        args.extend([
            "-maxrate".into(),
            format!("{}k", spec.profile.video_kbps),
            "-bufsize".into(),
            format!("{}k", spec.profile.video_kbps * 2),
        ]);
    }
    args.extend(preset_args(spec.codec, encode_accel, spec.compression));

    // Audio is always stereo AAC for HLS compatibility.
    args.extend([
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        format!("{}k", spec.profile.audio_kbps),
        "-ac".into(),
        "2".into(),
    ]);

    // Segment-aligned keyframes: fixed GOP, scene-cut detection off so
    // keyframe placement stays deterministic.
    let gop = spec.segment_secs * ASSUMED_FPS;
    args.extend([
        "-g".into(),
        gop.to_string(),
        "-keyint_min".into(),
        gop.to_string(),
        "-sc_threshold".into(),
        "0".into(),
        "-force_key_frames".into(),
        format!("expr:gte(t,n_forced*{})", spec.segment_secs),
    ]);

    if spec.web_compat {
        args.extend(web_compat_args(spec.codec, encode_accel));
    }

    // HLS muxer: unbounded VOD playlist, independent segments, numbered
    // segment files, playlist path last.
    args.extend([
        "-f".into(),
        "hls".into(),
        "-hls_time".into(),
        spec.segment_secs.to_string(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-hls_segment_type".into(),
        "mpegts".into(),
        "-hls_flags".into(),
        "independent_segments".into(),
        "-hls_segment_filename".into(),
        spec.segment_pattern.to_string_lossy().into_owned(),
    ]);
    args.push(spec.playlist.to_string_lossy().into_owned());
    args
}

/// Encoder name for a codec preference crossed with the active capability.
/// Combinations without a hardware encoder fall through to the software
/// encoder for that codec.
pub fn encoder_name(codec: VideoCodec, accel: Option<HwAccel>) -> &'static str {
    match (codec, accel) {
        (VideoCodec::H264, Some(HwAccel::Nvenc)) => "h264_nvenc",
        (VideoCodec::H264, Some(HwAccel::Qsv)) => "h264_qsv",
        (VideoCodec::H264, Some(HwAccel::Vaapi)) => "h264_vaapi",
        (VideoCodec::H264, Some(HwAccel::VideoToolbox)) => "h264_videotoolbox",
        (VideoCodec::H264, None) => "libx264",
        (VideoCodec::Hevc, Some(HwAccel::Nvenc)) => "hevc_nvenc",
        (VideoCodec::Hevc, Some(HwAccel::Qsv)) => "hevc_qsv",
        (VideoCodec::Hevc, Some(HwAccel::Vaapi)) => "hevc_vaapi",
        (VideoCodec::Hevc, Some(HwAccel::VideoToolbox)) => "hevc_videotoolbox",
        (VideoCodec::Hevc, None) => "libx265",
        (VideoCodec::Av1, Some(HwAccel::Nvenc)) => "av1_nvenc",
        (VideoCodec::Av1, Some(HwAccel::Qsv)) => "av1_qsv",
        (VideoCodec::Av1, Some(HwAccel::Vaapi)) => "av1_vaapi",
        // VideoToolbox has no AV1 encoder
        (VideoCodec::Av1, Some(HwAccel::VideoToolbox)) | (VideoCodec::Av1, None) => "libsvtav1",
    }
}

/// The accelerator actually driving the encoder, after software fallbacks.
fn encode_accel(codec: VideoCodec, accel: Option<HwAccel>) -> Option<HwAccel> {
    match (codec, accel) {
        (VideoCodec::Av1, Some(HwAccel::VideoToolbox)) => None,
        _ => accel,
    }
}

fn decode_flags(accel: HwAccel) -> &'static [&'static str] {
    match accel {
        HwAccel::Nvenc => &["-hwaccel", "cuda"],
        HwAccel::Qsv => &["-hwaccel", "qsv"],
        HwAccel::Vaapi => &["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"],
        HwAccel::VideoToolbox => &["-hwaccel", "videotoolbox"],
    }
}

/// Downscale filter for the target height, keeping frames wherever the
/// encoder needs them.
fn scale_filter(spec: &EncodeSpec) -> String {
    let height = spec.profile.height;
    match (spec.accel, spec.hw_decode) {
        // Decoded VAAPI frames stay on the device.
        (Some(HwAccel::Vaapi), true) => format!("scale_vaapi=-2:{height}"),
        // Software frames must be uploaded before a VAAPI encoder sees them.
        (Some(HwAccel::Vaapi), false) => format!("scale=-2:{height},format=nv12,hwupload"),
        _ => format!("scale=-2:{height}"),
    }
}

/// Constant-quality flags per encoder family.
fn quality_args(encode_accel: Option<HwAccel>, crf: u8) -> Vec<String> {
    match encode_accel {
        None => vec!["-crf".into(), crf.to_string()],
        Some(HwAccel::Nvenc) => vec!["-rc".into(), "vbr".into(), "-cq".into(), crf.to_string()],
        Some(HwAccel::Qsv) => vec!["-global_quality".into(), crf.to_string()],
        Some(HwAccel::Vaapi) => vec!["-rc_mode".into(), "CQP".into(), "-qp".into(), crf.to_string()],
        Some(HwAccel::VideoToolbox) => vec!["-q:v".into(), crf.to_string()],
    }
}

/// Preset/tuning pair for the three-level compression enum, per encoder
/// family.
fn preset_args(
    codec: VideoCodec,
    encode_accel: Option<HwAccel>,
    level: CompressionLevel,
) -> Vec<String> {
    let pair = |flag: &str, value: &str| vec![flag.to_string(), value.to_string()];
    match encode_accel {
        None => match codec {
            // SVT-AV1 presets are numeric, lower is slower
            VideoCodec::Av1 => match level {
                CompressionLevel::Balanced => pair("-preset", "10"),
                CompressionLevel::High => pair("-preset", "8"),
                CompressionLevel::Maximum => pair("-preset", "6"),
            },
            _ => match level {
                CompressionLevel::Balanced => pair("-preset", "veryfast"),
                CompressionLevel::High => pair("-preset", "medium"),
                CompressionLevel::Maximum => pair("-preset", "slow"),
            },
        },
        Some(HwAccel::Nvenc) => match level {
            CompressionLevel::Balanced => pair("-preset", "p3"),
            CompressionLevel::High => pair("-preset", "p5"),
            CompressionLevel::Maximum => pair("-preset", "p7"),
        },
        Some(HwAccel::Qsv) => match level {
            CompressionLevel::Balanced => pair("-preset", "faster"),
            CompressionLevel::High => pair("-preset", "medium"),
            CompressionLevel::Maximum => pair("-preset", "slower"),
        },
        Some(HwAccel::Vaapi) => match level {
            CompressionLevel::Balanced => pair("-compression_level", "7"),
            CompressionLevel::High => pair("-compression_level", "4"),
            CompressionLevel::Maximum => pair("-compression_level", "1"),
        },
        // VideoToolbox manages its own rate/speed trade-off
        Some(HwAccel::VideoToolbox) => Vec::new(),
    }
}

/// Browser-compatibility flags: 8-bit 4:2:0 output (software encoders only;
/// hardware pipelines pick their own surface format), a conservative
/// profile/level ceiling, and fast-start.
fn web_compat_args(codec: VideoCodec, encode_accel: Option<HwAccel>) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if encode_accel.is_none() {
        args.extend(["-pix_fmt".into(), "yuv420p".into()]);
    }
    match codec {
        VideoCodec::H264 => {
            args.extend([
                "-profile:v".into(),
                "high".into(),
                "-level:v".into(),
                "4.1".into(),
            ]);
        }
        VideoCodec::Hevc => {
            args.extend(["-tag:v".into(), "hvc1".into()]);
        }
        VideoCodec::Av1 => {}
    }
    args.extend(["-movflags".into(), "+faststart".into()]);
    args
}
