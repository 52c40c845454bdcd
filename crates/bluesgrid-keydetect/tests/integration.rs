//! Integration tests for bluesgrid-keydetect.
//!
//! Exercise the full pipeline through `KeyDetector`: synthetic bass lines,
//! silence, missing audio, slow sources, cancellation and the deadline.

use std::thread;
use std::time::{Duration, Instant};

use bluesgrid_keydetect::{
    CancelToken, DecodeLimits, DecodeOutcome, DetectError, DetectionConfig, DetectionOutcome,
    KeyClassifier, KeyDetector, MINOR_PROFILE, MemorySource, MusicalKey, Note, NoteHistogram,
    PcmBuffer, PcmCollector, PcmSource, PitchTracker, ScaleType, TrackerConfig,
};

const SR: u32 = 22_050;

fn tone(freq: f32, secs: f32) -> Vec<f32> {
    let len = (SR as f32 * secs) as usize;
    (0..len)
        .map(|i| 0.5 * (std::f32::consts::TAU * freq * i as f32 / SR as f32).sin())
        .collect()
}

/// Bass line cycling through `notes` (Hz), `secs_each` per note.
fn bass_line(notes: &[f32], secs_each: f32, repeats: usize) -> Vec<f32> {
    let mut out = Vec::new();
    for _ in 0..repeats {
        for &f in notes {
            out.extend(tone(f, secs_each));
        }
    }
    out
}

/// Emits one second of a tone per step, sleeping between steps, forever
/// unless told to stop.
struct SlowSource {
    freq: f32,
    step: Duration,
}

impl PcmSource for SlowSource {
    fn decode(
        &mut self,
        limits: &DecodeLimits,
        cancel: &CancelToken,
    ) -> bluesgrid_keydetect::Result<DecodeOutcome> {
        let mut collector = PcmCollector::new(limits, SR, 1);
        let chunk = tone(self.freq, 1.0);
        while !cancel.should_stop() {
            if collector.push_interleaved(&chunk) {
                break;
            }
            thread::sleep(self.step);
        }
        Ok(DecodeOutcome::Decoded(collector.finish()))
    }
}

/// Ignores its token entirely.
struct StuckSource;

impl PcmSource for StuckSource {
    fn decode(
        &mut self,
        _limits: &DecodeLimits,
        _cancel: &CancelToken,
    ) -> bluesgrid_keydetect::Result<DecodeOutcome> {
        thread::sleep(Duration::from_secs(6));
        Ok(DecodeOutcome::NoAudioTrack)
    }
}

struct BrokenSource;

impl PcmSource for BrokenSource {
    fn decode(
        &mut self,
        _limits: &DecodeLimits,
        _cancel: &CancelToken,
    ) -> bluesgrid_keydetect::Result<DecodeOutcome> {
        Err(DetectError::Unsupported("no codec".into()))
    }
}

// ---------------------------------------------------------------------------
// 1. Detection quality
// ---------------------------------------------------------------------------

#[test]
fn sine_110_is_tracked_within_two_hz() {
    let tracker = PitchTracker::new(TrackerConfig::default(), SR);
    let f = tracker
        .estimate_frequency(&tone(110.0, 4096.0 / SR as f32 + 0.01)[..4096])
        .expect("a clean tone is voiced");
    assert!((f - 110.0).abs() <= 2.0, "estimated {f}");
}

#[test]
fn minor_bass_line_is_found() {
    // E2 G2 A2 B2 D3 E2: E minor pentatonic walking bass, tonic weighted.
    let line = bass_line(&[82.41, 82.41, 98.0, 110.0, 123.47, 146.83, 82.41], 1.0, 2);
    let result = KeyDetector::default().detect_pcm(&PcmBuffer::new(line, SR));
    assert_eq!(result.outcome, DetectionOutcome::Detected);
    assert_eq!(result.key, MusicalKey::new(Note::E, ScaleType::Minor));
    assert!(result.confidence > 0.5);
}

#[test]
fn rotated_minor_profile_detected_for_every_root() {
    let classifier = KeyClassifier::default();
    for k in 0..12 {
        let mut counts = [0u32; 12];
        for (i, w) in MINOR_PROFILE.iter().enumerate() {
            counts[(i + k) % 12] = (w * 10.0).round() as u32;
        }
        let result = classifier.classify(&NoteHistogram::from_counts(counts));
        assert_eq!(result.key.root, Note::from_semitone(k as i32));
        assert_eq!(result.key.scale, ScaleType::Minor);
        assert!(result.confidence > 0.9);
    }
}

// ---------------------------------------------------------------------------
// 2. Default results
// ---------------------------------------------------------------------------

#[test]
fn silence_gives_default_with_zero_windows() {
    let mut src = MemorySource::mono(vec![0.0; SR as usize * 10], SR);
    let result = KeyDetector::default().detect(&mut src);
    assert_eq!(result.histogram.total(), 0);
    assert_eq!(result.key, MusicalKey::DEFAULT_DETECTION);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn fewer_than_ten_counts_is_default_whatever_the_shape() {
    let classifier = KeyClassifier::default();
    for counts in [
        [9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0],
        [0, 0, 0, 0, 4, 0, 0, 5, 0, 0, 0, 0],
    ] {
        let result = classifier.classify(&NoteHistogram::from_counts(counts));
        assert_eq!(result.key, MusicalKey::new(Note::A, ScaleType::Minor));
        assert_eq!(result.confidence, 0.0);
    }
}

#[test]
fn short_clip_is_inconclusive() {
    // 0.5 s gives only four windows.
    let result = KeyDetector::default().detect_pcm(&PcmBuffer::new(tone(110.0, 0.5), SR));
    assert_eq!(result.outcome, DetectionOutcome::Inconclusive);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn decode_failure_is_absorbed() {
    let result = KeyDetector::default().detect(&mut BrokenSource);
    assert_eq!(result.outcome, DetectionOutcome::Failed);
    assert_eq!(result.key, MusicalKey::DEFAULT_DETECTION);
}

#[test]
fn analysis_length_is_capped() {
    let config = DetectionConfig {
        max_duration_secs: 5.0,
        ..DetectionConfig::default()
    };
    let mut src = MemorySource::mono(tone(110.0, 12.0), SR);
    let result = KeyDetector::new(config).detect(&mut src);
    assert!((result.analyzed_secs - 5.0).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// 3. Cancellation and timeout
// ---------------------------------------------------------------------------

#[test]
fn cancel_stops_a_running_detection() {
    let handle = KeyDetector::default().spawn(SlowSource {
        freq: 110.0,
        step: Duration::from_millis(20),
    });
    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    handle.cancel();
    let result = handle.wait();
    assert_eq!(result.outcome, DetectionOutcome::Cancelled);
    assert_eq!(result.confidence, 0.0);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn deadline_returns_partial_result() {
    let config = DetectionConfig {
        timeout: Duration::from_millis(300),
        ..DetectionConfig::default()
    };
    let started = Instant::now();
    let result = KeyDetector::new(config)
        .spawn(SlowSource {
            freq: 110.0,
            step: Duration::from_millis(100),
        })
        .wait();
    assert_eq!(result.outcome, DetectionOutcome::Partial);
    assert_eq!(result.key.root, Note::A);
    assert!(result.analyzed_secs > 1.0 && result.analyzed_secs < 30.0);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn unresponsive_source_is_abandoned() {
    let config = DetectionConfig {
        timeout: Duration::from_millis(100),
        ..DetectionConfig::default()
    };
    let started = Instant::now();
    let result = KeyDetector::new(config).spawn(StuckSource).wait();
    assert_eq!(result.outcome, DetectionOutcome::TimedOut);
    assert_eq!(result.confidence, 0.0);
    assert!(started.elapsed() < Duration::from_secs(5));
}
