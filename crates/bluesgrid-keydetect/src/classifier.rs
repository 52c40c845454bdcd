//! Krumhansl-Schmuckler key classification.
//!
//! The normalized histogram is rotated to each of the 12 candidate roots
//! and correlated (Pearson) against the Krumhansl-Kessler major and minor
//! profiles. The best of the 24 candidates wins; ties go to the first seen,
//! iterating roots upward and trying major before minor.

use crate::detector::{DetectionOutcome, KeyDetectionResult};
use crate::histogram::NoteHistogram;
use crate::key::{MusicalKey, Note, ScaleType};

/// Krumhansl-Kessler major profile, tonic first.
pub const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor profile, tonic first.
pub const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Minimum accepted windows for a conclusive result.
pub const DEFAULT_MIN_WINDOWS: u32 = 10;

/// Pearson correlation of two equal-length series; 0 when either is flat.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut num, mut den_a, mut den_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let da = x - mean_a;
        let db = y - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }
    let den = den_a.sqrt() * den_b.sqrt();
    if den > 0.0 { num / den } else { 0.0 }
}

/// Correlation of one candidate key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyScore {
    /// Candidate key.
    pub key: MusicalKey,
    /// Pearson correlation in [-1, 1].
    pub correlation: f64,
}

/// Chooses a key from a pitch-class histogram.
#[derive(Clone, Copy, Debug)]
pub struct KeyClassifier {
    min_windows: u32,
}

impl Default for KeyClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WINDOWS)
    }
}

impl KeyClassifier {
    /// Classifier that needs at least `min_windows` histogram counts.
    pub fn new(min_windows: u32) -> Self {
        Self { min_windows }
    }

    /// Required histogram total.
    pub fn min_windows(&self) -> u32 {
        self.min_windows
    }

    /// All 24 candidates in iteration order (root ascending, major first).
    pub fn scores(&self, histogram: &NoteHistogram) -> Vec<KeyScore> {
        let dist = histogram.distribution();
        let mut scores = Vec::with_capacity(24);
        for root in 0..12 {
            let rotated: [f64; 12] = core::array::from_fn(|i| dist[(i + root) % 12]);
            let note = Note::from_semitone(root as i32);
            for (scale, profile) in [
                (ScaleType::Major, &MAJOR_PROFILE),
                (ScaleType::Minor, &MINOR_PROFILE),
            ] {
                scores.push(KeyScore {
                    key: MusicalKey::new(note, scale),
                    correlation: pearson(&rotated, profile),
                });
            }
        }
        scores
    }

    /// Best-fitting key. With fewer than `min_windows` counts the result is
    /// A minor with confidence 0, whatever the histogram looks like.
    pub fn classify(&self, histogram: &NoteHistogram) -> KeyDetectionResult {
        if histogram.total() < self.min_windows {
            return KeyDetectionResult::inconclusive(*histogram, DetectionOutcome::Inconclusive);
        }

        let mut best = KeyScore {
            key: MusicalKey::DEFAULT_DETECTION,
            correlation: -2.0,
        };
        for score in self.scores(histogram) {
            if score.correlation > best.correlation {
                best = score;
            }
        }

        let confidence = (((best.correlation + 1.0) / 2.0) as f32).clamp(0.0, 1.0);
        KeyDetectionResult {
            key: best.key,
            confidence,
            histogram: *histogram,
            outcome: DetectionOutcome::Detected,
            analyzed_secs: 0.0,
        }
    }
}
