//! Master playlist assembly and atomic persistence.

use std::path::Path;

use shelfstream_core::VideoCodec;

use crate::PipelineError;
use crate::ladder::QualityProfile;

/// Master playlist filename at each job's output root.
pub const MASTER_NAME: &str = "master.m3u8";

/// One succeeded quality track, referenced by relative path.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub profile: QualityProfile,
    pub playlist_rel: String,
}

/// RFC 6381 codec attribute advertised per stream; fixed per codec
/// preference.
pub fn codec_signature(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::H264 => "avc1.640028,mp4a.40.2",
        VideoCodec::Hevc => "hvc1.2.4.L123.B0,mp4a.40.2",
        VideoCodec::Av1 => "av01.0.08M.08,mp4a.40.2",
    }
}

/// Render the master playlist body: one stream-info line per entry, highest
/// resolution first. An empty entry list still renders a syntactically valid
/// playlist.
pub fn render_master(entries: &[ManifestEntry], codec: VideoCodec) -> String {
    let mut sorted: Vec<&ManifestEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.profile.height.cmp(&a.profile.height));

    let mut body = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for entry in sorted {
        body.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={},CODECS=\"{}\"\n{}\n",
            entry.profile.bandwidth(),
            entry.profile.resolution(),
            codec_signature(codec),
            entry.playlist_rel
        ));
    }
    body
}

/// Write the master playlist atomically: temp file in the same directory,
/// then rename over the final path. A failed write never leaves a partial
/// manifest behind; the error propagates to the caller.
pub async fn write_master(path: &Path, body: &str) -> Result<(), PipelineError> {
    let tmp = path.with_extension("m3u8.tmp");
    if let Err(e) = tokio::fs::write(&tmp, body).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(PipelineError::ManifestWrite(e.to_string()));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(PipelineError::ManifestWrite(e.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::LADDER;

    fn entry(index: usize) -> ManifestEntry {
        ManifestEntry {
            profile: LADDER[index],
            playlist_rel: format!("{}/index.m3u8", LADDER[index].name),
        }
    }

    #[test]
    fn renders_streams_sorted_by_descending_height() {
        // deliberately out of order: 480p, 1080p, 720p
        let body = render_master(&[entry(4), entry(2), entry(3)], VideoCodec::H264);

        let heights: Vec<u32> = body
            .lines()
            .filter(|l| l.starts_with("#EXT-X-STREAM-INF"))
            .map(|l| {
                let res = l.split("RESOLUTION=").nth(1).unwrap();
                let res = res.split(',').next().unwrap();
                res.split('x').nth(1).unwrap().parse().unwrap()
            })
            .collect();

        assert_eq!(heights, vec![1080, 720, 480]);
        assert_eq!(body.matches("#EXT-X-STREAM-INF").count(), 3);
        assert!(body.contains("1080p/index.m3u8"));
        assert!(body.contains("CODECS=\"avc1.640028,mp4a.40.2\""));
    }

    #[test]
    fn empty_manifest_is_still_valid() {
        let body = render_master(&[], VideoCodec::H264);
        assert!(body.starts_with("#EXTM3U"));
        assert!(!body.contains("#EXT-X-STREAM-INF"));
    }

    #[test]
    fn bandwidth_includes_overhead() {
        let body = render_master(&[entry(2)], VideoCodec::H264);
        // 1080p: (6000 + 160) kbps plus 10% overhead
        assert!(body.contains("BANDWIDTH=6776000"));
    }

    #[tokio::test]
    async fn write_is_atomic_and_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(MASTER_NAME);

        let body = render_master(&[entry(2), entry(3)], VideoCodec::Hevc);
        write_master(&path, &body).await.unwrap();

        let read_back = std::fs::read_to_string(&path).unwrap();
        assert_eq!(read_back, body);
        // no stray temp file
        assert!(!tmp.path().join("master.m3u8.tmp").exists());
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let missing_dir = std::path::Path::new("/nonexistent-shelfstream/master.m3u8");
        let err = write_master(missing_dir, "#EXTM3U\n").await;
        assert!(matches!(err, Err(PipelineError::ManifestWrite(_))));
    }
}
