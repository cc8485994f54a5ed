//! The static quality ladder and per-source selection.

use serde::Serialize;
use shelfstream_core::QualityMode;

/// One output quality tier. Values are static configuration, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
    pub audio_kbps: u32,
}

impl QualityProfile {
    /// Peak bandwidth advertised in the master playlist, in bits per second,
    /// including 10% container overhead.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_kbps + self.audio_kbps) * 1000 * 11 / 10
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Candidate output profiles, highest resolution first.
pub const LADDER: &[QualityProfile] = &[
    QualityProfile {
        name: "2160p",
        width: 3840,
        height: 2160,
        video_kbps: 16000,
        audio_kbps: 192,
    },
    QualityProfile {
        name: "1440p",
        width: 2560,
        height: 1440,
        video_kbps: 10000,
        audio_kbps: 192,
    },
    QualityProfile {
        name: "1080p",
        width: 1920,
        height: 1080,
        video_kbps: 6000,
        audio_kbps: 160,
    },
    QualityProfile {
        name: "720p",
        width: 1280,
        height: 720,
        video_kbps: 3000,
        audio_kbps: 128,
    },
    QualityProfile {
        name: "480p",
        width: 854,
        height: 480,
        video_kbps: 1200,
        audio_kbps: 96,
    },
];

/// Narrow the ladder for one source video. Never returns an empty list: the
/// adaptive filter falls back to the lowest rung when the window misses the
/// whole ladder.
pub fn select_qualities(
    source_height: u32,
    mode: QualityMode,
    min_ratio: f64,
    max_ratio: f64,
) -> Vec<QualityProfile> {
    match mode {
        QualityMode::Equal => vec![nearest(source_height)],
        QualityMode::Adaptive => {
            let lo = f64::from(source_height) * min_ratio;
            let hi = f64::from(source_height) * max_ratio;
            let picked: Vec<QualityProfile> = LADDER
                .iter()
                .copied()
                .filter(|p| f64::from(p.height) >= lo && f64::from(p.height) <= hi)
                .collect();
            if picked.is_empty() {
                vec![LADDER[LADDER.len() - 1]]
            } else {
                picked
            }
        }
        QualityMode::AdaptiveAll => LADDER.to_vec(),
    }
}

/// The rung whose height is closest to the source; ladder order breaks ties.
fn nearest(source_height: u32) -> QualityProfile {
    let mut best = LADDER[0];
    let mut best_diff = best.height.abs_diff(source_height);
    for profile in &LADDER[1..] {
        let diff = profile.height.abs_diff(source_height);
        if diff < best_diff {
            best = *profile;
            best_diff = diff;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_picks_the_closest_rung() {
        let picked = select_qualities(1080, QualityMode::Equal, 0.5, 1.1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "1080p");

        let picked = select_qualities(1200, QualityMode::Equal, 0.5, 1.1);
        assert_eq!(picked[0].name, "1080p");

        let picked = select_qualities(4320, QualityMode::Equal, 0.5, 1.1);
        assert_eq!(picked[0].name, "2160p");
    }

    #[test]
    fn equal_tie_breaks_by_ladder_order() {
        // 1260 is equidistant from 1440 and 1080; the earlier rung wins.
        let picked = select_qualities(1260, QualityMode::Equal, 0.5, 1.1);
        assert_eq!(picked[0].name, "1440p");
    }

    #[test]
    fn equal_is_minimal_over_the_ladder() {
        for h in [0u32, 144, 480, 700, 1000, 1100, 2000, 3000, 9000] {
            let sel = select_qualities(h, QualityMode::Equal, 0.5, 1.1)[0];
            for p in LADDER {
                assert!(
                    p.height.abs_diff(h) >= sel.height.abs_diff(h),
                    "height {h}: {} beats {}",
                    p.name,
                    sel.name
                );
            }
        }
    }

    #[test]
    fn adaptive_window_sorted_descending() {
        let picked = select_qualities(1080, QualityMode::Adaptive, 0.5, 1.1);
        let names: Vec<_> = picked.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["1080p", "720p"]);
    }

    #[test]
    fn adaptive_never_empty() {
        for h in 0..5000 {
            let picked = select_qualities(h, QualityMode::Adaptive, 0.5, 1.1);
            assert!(!picked.is_empty(), "empty selection for height {h}");
        }
    }

    #[test]
    fn adaptive_falls_back_to_lowest_rung() {
        // Window [50, 110] misses the whole ladder.
        let picked = select_qualities(100, QualityMode::Adaptive, 0.5, 1.1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "480p");
    }

    #[test]
    fn adaptive_all_returns_whole_ladder_descending() {
        let picked = select_qualities(720, QualityMode::AdaptiveAll, 0.5, 1.1);
        assert_eq!(picked.len(), LADDER.len());
        assert!(picked.windows(2).all(|w| w[0].height > w[1].height));
    }
}
