//! bluesgrid keydetect - musical key detection from a backing track
//!
//! Offline pipeline that turns decoded audio into a key:
//!
//! ```text
//! PcmSource ─▶ mono, ~22 kHz, ≤ 30 s
//!           ─▶ PitchTracker (300 Hz low-pass, 4096/2048 windows,
//!                            energy gate, autocorrelation 40–300 Hz)
//!           ─▶ NoteHistogram (12 pitch classes)
//!           ─▶ KeyClassifier (Krumhansl-Schmuckler, 24 candidates)
//!           ─▶ KeyDetectionResult { key, confidence, histogram, outcome }
//! ```
//!
//! Detection always produces a result. Failures, cancellation and
//! inconclusive input give A minor with confidence 0.
//!
//! The crate also generates the blues-scale grid for a detected key.
//!
//! # Example
//!
//! ```rust
//! use bluesgrid_keydetect::{KeyDetector, Note, PcmBuffer};
//!
//! let sr = 22_050;
//! let tone: Vec<f32> = (0..sr * 3)
//!     .map(|i| 0.5 * (std::f32::consts::TAU * 110.0 * i as f32 / sr as f32).sin())
//!     .collect();
//!
//! let result = KeyDetector::default().detect_pcm(&PcmBuffer::new(tone, sr as u32));
//! assert_eq!(result.key.root, Note::A);
//! ```

pub mod classifier;
pub mod detector;
pub mod error;
pub mod histogram;
pub mod key;
pub mod pitch;
pub mod scale;
pub mod source;

pub use classifier::{DEFAULT_MIN_WINDOWS, KeyClassifier, KeyScore, MAJOR_PROFILE, MINOR_PROFILE, pearson};
pub use detector::{
    DetectionConfig, DetectionHandle, DetectionOutcome, DetectionStage, KeyDetectionResult,
    KeyDetector,
};
pub use error::{DetectError, ParseKeyError, Result};
pub use histogram::NoteHistogram;
pub use key::{MusicalKey, Note, ScaleType};
pub use pitch::{
    PitchTracker, SHORTEST_PERIOD_RATIO, TrackSummary, TrackerConfig, frequency_to_pitch_class,
};
pub use scale::{
    DEFAULT_BASE_OCTAVE, MAJOR_BLUES, MINOR_BLUES, NoteInfo, blue_note_interval, blues_intervals,
    grid_notes, midi_to_frequency, note_to_midi,
};
pub use source::{
    CancelToken, DecodeLimits, DecodeOutcome, MemorySource, PcmBuffer, PcmCollector, PcmSource,
};
