//! End-to-end pipeline behavior against stub ffmpeg/ffprobe binaries. The
//! stubs write the files a real encoder would, so the orchestration, manifest
//! and validation paths run for real without encoding anything.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use shelfstream_core::{AccelMode, QualityMode};
use shelfstream_pipeline::convert::{self, JobOutcome, SourceVideo};
use shelfstream_pipeline::progress::ProgressEvent;
use shelfstream_pipeline::{PipelineConfig, batch, validate};

/// Stub encoder: writes a 10.4s quality playlist (plus segment files) at the
/// final argument, like a successful ffmpeg HLS run.
const ENCODER_OK: &str = r#"#!/bin/sh
for last in "$@"; do :; done
dir=$(dirname "$last")
mkdir -p "$dir"
cat > "$last" <<'PLAYLIST'
#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-INDEPENDENT-SEGMENTS
#EXTINF:6.000000,
seg_00000.ts
#EXTINF:4.400000,
seg_00001.ts
#EXT-X-ENDLIST
PLAYLIST
: > "$dir/seg_00000.ts"
: > "$dir/seg_00001.ts"
exit 0
"#;

/// Same as ENCODER_OK but the 720p rung fails, to exercise task isolation.
const ENCODER_FAILS_720P: &str = r#"#!/bin/sh
for last in "$@"; do :; done
case "$last" in
  *720p*) echo "Conversion failed!" >&2; exit 2;;
esac
dir=$(dirname "$last")
mkdir -p "$dir"
cat > "$last" <<'PLAYLIST'
#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXTINF:6.000000,
seg_00000.ts
#EXTINF:4.400000,
seg_00001.ts
#EXT-X-ENDLIST
PLAYLIST
: > "$dir/seg_00000.ts"
: > "$dir/seg_00001.ts"
exit 0
"#;

/// Stub prober: reports a 10.4s 1080p h264 source for any input.
const PROBER: &str = r#"#!/bin/sh
cat <<'JSON'
{
  "format": { "format_name": "matroska", "duration": "10.4" },
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080 }
  ]
}
JSON
exit 0
"#;

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn stub_config(tmp: &Path, encoder: &str) -> PipelineConfig {
    PipelineConfig {
        ffmpeg_path: write_stub(tmp, "fake-ffmpeg", encoder),
        ffprobe_path: write_stub(tmp, "fake-ffprobe", PROBER),
        output_root: tmp.join("out"),
        accel: AccelMode::Off,
        concurrency: Some(2),
        ..Default::default()
    }
}

fn source_1080(path: PathBuf) -> SourceVideo {
    SourceVideo {
        path,
        size_bytes: 4,
        duration_secs: 10.4,
        width: 1920,
        height: 1080,
        codec: "h264".into(),
    }
}

#[tokio::test]
async fn converts_and_validates_with_stub_encoder() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = stub_config(tmp.path(), ENCODER_OK);
    cfg.quality_mode = QualityMode::Equal;

    let video = source_1080(tmp.path().join("Movie.mkv"));
    let job = convert::build_job(&cfg, video);
    assert_eq!(job.tasks.len(), 1);
    assert_eq!(job.tasks[0].profile.name, "1080p");

    let report = convert::convert_job(&cfg, None, job, None).await;
    assert_eq!(report.outcome, JobOutcome::Converted);
    assert!(report.task_errors.is_empty());

    let output_dir = cfg.output_root.join("Movie");
    let master = std::fs::read_to_string(output_dir.join("master.m3u8")).unwrap();
    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 1);
    assert!(master.contains("1080p/index.m3u8"));

    let result = validate::validate_output(10.4, &output_dir, 2.0).await;
    assert!(result.aligned);
    assert_eq!(result.tracks.len(), 1);
    assert_eq!(result.tracks[0].segment_count, 2);
}

#[tokio::test]
async fn failed_quality_is_isolated_from_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = stub_config(tmp.path(), ENCODER_FAILS_720P);
    // adaptive mode on a 1080p source selects 1080p and 720p

    let video = source_1080(tmp.path().join("Movie.mkv"));
    let job = convert::build_job(&cfg, video);
    assert_eq!(job.tasks.len(), 2);

    let report = convert::convert_job(&cfg, None, job, None).await;
    assert_eq!(report.outcome, JobOutcome::PartiallyConverted);
    assert_eq!(report.task_errors.len(), 1);
    assert_eq!(report.task_errors[0].0, "720p");
    assert!(report.task_errors[0].1.contains("Conversion failed!"));

    // the failed quality is simply omitted from the manifest
    let master =
        std::fs::read_to_string(cfg.output_root.join("Movie").join("master.m3u8")).unwrap();
    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 1);
    assert!(master.contains("1080p/index.m3u8"));
    assert!(!master.contains("720p/index.m3u8"));
}

#[tokio::test]
async fn second_run_skips_aligned_output() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = stub_config(tmp.path(), ENCODER_OK);

    let library = tmp.path().join("library");
    std::fs::create_dir_all(&library).unwrap();
    std::fs::write(library.join("Movie.mkv"), b"data").unwrap();
    let paths = vec![library.join("Movie.mkv")];

    let first = batch::run(&cfg, paths.clone(), None).await.unwrap();
    assert_eq!(first.converted, 1);
    assert_eq!(first.skipped, 0);

    let second = batch::run(&cfg, paths, None).await.unwrap();
    assert_eq!(second.converted, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn misaligned_output_is_deleted_and_redone_first() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = stub_config(tmp.path(), ENCODER_OK);
    cfg.concurrency = Some(1);

    let library = tmp.path().join("library");
    std::fs::create_dir_all(&library).unwrap();
    std::fs::write(library.join("Fresh.mkv"), b"data").unwrap();
    std::fs::write(library.join("Stale.mkv"), b"data").unwrap();

    // existing output for Stale.mkv that reconstructs 5s short of the source
    let stale_dir = cfg.output_root.join("Stale");
    std::fs::create_dir_all(stale_dir.join("1080p")).unwrap();
    std::fs::write(
        stale_dir.join("master.m3u8"),
        "#EXTM3U\n#EXT-X-VERSION:3\n\
         #EXT-X-STREAM-INF:BANDWIDTH=6776000,RESOLUTION=1920x1080\n\
         1080p/index.m3u8\n",
    )
    .unwrap();
    std::fs::write(
        stale_dir.join("1080p/index.m3u8"),
        "#EXTM3U\n#EXTINF:5.400000,\nseg_00000.ts\n#EXT-X-ENDLIST\n",
    )
    .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let paths = vec![library.join("Fresh.mkv"), library.join("Stale.mkv")];
    let report = batch::run(&cfg, paths, Some(&tx)).await.unwrap();
    drop(tx);

    assert_eq!(report.converted, 2);
    assert_eq!(report.skipped, 0);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    // the stale video is re-queued ahead of the untouched one
    let first_started = events.iter().find_map(|e| match e {
        ProgressEvent::TaskStarted { video, .. } => Some(video.clone()),
        _ => None,
    });
    assert_eq!(first_started, Some(library.join("Stale.mkv")));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ProgressEvent::JobRequeued { video } if video.ends_with("Stale.mkv")))
    );

    // the redone output now aligns
    let result = validate::validate_output(10.4, &cfg.output_root.join("Stale"), 2.0).await;
    assert!(result.aligned);
}
