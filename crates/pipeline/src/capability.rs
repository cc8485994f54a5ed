//! Hardware acceleration detection.
//!
//! Probes for usable accelerators by listing the encoders the local ffmpeg
//! build advertises, checking for the vendor device, and running a one-second
//! trial encode. Absence of a capability is expected, never an error.

use std::path::Path;

use shelfstream_core::{HwAccel, VideoCodec};
use tracing::{debug, info};

use crate::command;

/// Hardware encoders the local ffmpeg build advertises.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EncoderSupport {
    pub nvenc: bool,
    pub qsv: bool,
    pub vaapi: bool,
    pub videotoolbox: bool,
}

impl EncoderSupport {
    fn none() -> Self {
        Self {
            nvenc: false,
            qsv: false,
            vaapi: false,
            videotoolbox: false,
        }
    }

    /// Advertised accelerators in probe priority order: NVENC, then QSV,
    /// then VAAPI, then VideoToolbox. Ordering reflects relative encode
    /// throughput.
    pub fn candidates(&self) -> Vec<HwAccel> {
        let mut out = Vec::new();
        if self.nvenc {
            out.push(HwAccel::Nvenc);
        }
        if self.qsv {
            out.push(HwAccel::Qsv);
        }
        if self.vaapi {
            out.push(HwAccel::Vaapi);
        }
        if self.videotoolbox {
            out.push(HwAccel::VideoToolbox);
        }
        out
    }

    /// Pick the best advertised accelerator without trial-encoding.
    pub fn best(&self) -> Option<HwAccel> {
        self.candidates().into_iter().next()
    }
}

/// Detect the active hardware accelerator. Never fails; the worst case is
/// software encoding. Only one accelerator is selected even when several
/// probes succeed.
pub async fn detect(ffmpeg_path: &Path) -> Option<HwAccel> {
    let support = advertised_encoders(ffmpeg_path).await;

    for accel in support.candidates() {
        if !device_present(accel) {
            debug!(accel = %accel, "encoder advertised but device missing");
            continue;
        }
        if trial_encode(ffmpeg_path, accel).await {
            info!(accel = %accel, "hardware encoder verified");
            return Some(accel);
        }
        debug!(accel = %accel, "trial encode failed");
    }

    info!("no hardware encoder available, using software encoding");
    None
}

async fn advertised_encoders(ffmpeg_path: &Path) -> EncoderSupport {
    let output = tokio::process::Command::new(ffmpeg_path)
        .args(["-hide_banner", "-encoders"])
        .output()
        .await;

    let encoders = match output {
        Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).into_owned(),
        _ => {
            info!("could not query ffmpeg encoders, assuming CPU-only");
            return EncoderSupport::none();
        }
    };

    EncoderSupport {
        nvenc: encoders.contains("h264_nvenc"),
        qsv: encoders.contains("h264_qsv"),
        vaapi: encoders.contains("h264_vaapi"),
        videotoolbox: encoders.contains("h264_videotoolbox"),
    }
}

/// Cheap device-presence check per accelerator, ahead of the trial encode.
fn device_present(accel: HwAccel) -> bool {
    match accel {
        HwAccel::Nvenc => nvidia_tool_present(),
        HwAccel::Qsv => true,
        HwAccel::Vaapi => vaapi_device_exists(),
        HwAccel::VideoToolbox => cfg!(target_os = "macos"),
    }
}

fn nvidia_tool_present() -> bool {
    std::process::Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if a VAAPI render node exists (Linux).
fn vaapi_device_exists() -> bool {
    Path::new("/dev/dri/renderD128").exists()
}

/// Encode a second of synthetic video through the candidate's H.264 encoder,
/// discarding the result. Success means the accelerator actually works, not
/// just that ffmpeg was built with it.
async fn trial_encode(ffmpeg_path: &Path, accel: HwAccel) -> bool {
    let encoder = command::encoder_name(VideoCodec::H264, Some(accel));

    let mut args: Vec<&str> = vec!["-hide_banner", "-loglevel", "error"];
    if accel == HwAccel::Vaapi {
        args.extend(["-vaapi_device", "/dev/dri/renderD128"]);
    }
    args.extend(["-f", "lavfi", "-i", "nullsrc=s=256x144:r=30:d=1"]);
    if accel == HwAccel::Vaapi {
        // VAAPI encoders only accept hardware frames
        args.extend(["-vf", "format=nv12,hwupload"]);
    }
    args.extend(["-frames:v", "8", "-c:v", encoder, "-f", "null", "-"]);

    let output = tokio::process::Command::new(ffmpeg_path)
        .args(&args)
        .output()
        .await;

    matches!(output, Ok(o) if o.status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_accelerator_preference() {
        let support = EncoderSupport {
            nvenc: true,
            qsv: true,
            vaapi: false,
            videotoolbox: false,
        };
        assert_eq!(support.best(), Some(HwAccel::Nvenc));

        let support = EncoderSupport {
            nvenc: false,
            qsv: true,
            vaapi: true,
            videotoolbox: true,
        };
        assert_eq!(support.best(), Some(HwAccel::Qsv));

        let support = EncoderSupport {
            nvenc: false,
            qsv: false,
            vaapi: true,
            videotoolbox: true,
        };
        assert_eq!(support.best(), Some(HwAccel::Vaapi));

        let support = EncoderSupport::none();
        assert_eq!(support.best(), None);
    }

    #[test]
    fn candidates_keep_priority_order() {
        let support = EncoderSupport {
            nvenc: true,
            qsv: true,
            vaapi: true,
            videotoolbox: true,
        };
        assert_eq!(
            support.candidates(),
            vec![
                HwAccel::Nvenc,
                HwAccel::Qsv,
                HwAccel::Vaapi,
                HwAccel::VideoToolbox
            ]
        );
    }
}
