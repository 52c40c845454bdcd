//! The PCM decoder contract.
//!
//! A [`PcmSource`] turns some opaque audio handle into mono float samples
//! at roughly the analysis rate, truncated to the analysis length. It must
//! tell "there is no audio track" apart from "here are N samples", and it
//! must check the [`CancelToken`] between decode steps, returning whatever
//! it has collected once the token says stop.
//!
//! [`PcmCollector`] does the shared part of that job (channel averaging,
//! integer decimation, length cap) so decoders only feed it interleaved
//! frames.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::Result;

/// Mono PCM at a known rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Wrap mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// The samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }

    /// Take the samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// What a decoder found.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome {
    /// The container holds no audio track.
    NoAudioTrack,
    /// Decoded mono PCM, possibly truncated or cut short by the token.
    Decoded(PcmBuffer),
}

/// Rate and length targets handed to decoders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeLimits {
    /// Rate the decimation aims for, in Hz.
    pub target_rate: u32,
    /// Maximum samples to keep after decimation.
    pub max_samples: usize,
}

impl DecodeLimits {
    /// Limits for `max_secs` seconds at `target_rate`.
    pub fn new(target_rate: u32, max_secs: f32) -> Self {
        let target_rate = target_rate.max(1);
        Self {
            target_rate,
            max_samples: (target_rate as f32 * max_secs.max(0.0)) as usize,
        }
    }

    /// Integer decimation factor for a source rate: `max(1, source / target)`.
    pub fn decimation(&self, source_rate: u32) -> u32 {
        (source_rate / self.target_rate).max(1)
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::new(22_050, 30.0)
    }
}

/// Shared stop signal for one detection run.
///
/// Explicit cancellation abandons the run. A passed deadline asks the
/// decoder and the tracker to finish early with what they have, after which
/// classification still runs on the partial data.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only stops when cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True once the deadline, if any, has passed.
    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True when a decoder should stop pulling data.
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.deadline_passed()
    }

    /// A token sharing this one's cancellation with its own deadline.
    pub fn with_deadline(&self, deadline: Option<Instant>) -> Self {
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }
}

/// Anything that can produce analysis PCM.
pub trait PcmSource: Send {
    /// Decode into mono PCM within `limits`, checking `cancel` between steps.
    fn decode(&mut self, limits: &DecodeLimits, cancel: &CancelToken) -> Result<DecodeOutcome>;

    /// Short description for logs.
    fn describe(&self) -> String {
        String::from("pcm source")
    }
}

/// Downmixes interleaved frames, decimates and caps the length.
#[derive(Debug)]
pub struct PcmCollector {
    samples: Vec<f32>,
    channels: usize,
    ratio: u32,
    phase: u32,
    max_samples: usize,
    output_rate: u32,
}

impl PcmCollector {
    /// Collector for a stream of `channels` channels at `source_rate`.
    pub fn new(limits: &DecodeLimits, source_rate: u32, channels: usize) -> Self {
        let ratio = limits.decimation(source_rate);
        Self {
            samples: Vec::with_capacity(limits.max_samples.min(1 << 20)),
            channels: channels.max(1),
            ratio,
            phase: 0,
            max_samples: limits.max_samples,
            output_rate: (source_rate / ratio).max(1),
        }
    }

    /// Feed interleaved frames. Returns `true` once the cap is reached.
    pub fn push_interleaved(&mut self, data: &[f32]) -> bool {
        let scale = 1.0 / self.channels as f32;
        for frame in data.chunks_exact(self.channels) {
            if self.is_full() {
                break;
            }
            if self.phase == 0 {
                self.samples.push(frame.iter().sum::<f32>() * scale);
            }
            self.phase = (self.phase + 1) % self.ratio;
        }
        self.is_full()
    }

    /// True once the cap is reached.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.max_samples
    }

    /// Samples collected so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Rate of the collected samples.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Finish and return the buffer.
    pub fn finish(self) -> PcmBuffer {
        PcmBuffer::new(self.samples, self.output_rate)
    }
}

/// In-memory interleaved PCM. Useful for rendered audio and tests.
#[derive(Clone, Debug)]
pub struct MemorySource {
    interleaved: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

impl MemorySource {
    /// Interleaved samples with `channels` channels at `sample_rate`.
    pub fn new(interleaved: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            interleaved,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Mono samples at `sample_rate`.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }
}

impl PcmSource for MemorySource {
    fn decode(&mut self, limits: &DecodeLimits, cancel: &CancelToken) -> Result<DecodeOutcome> {
        if self.interleaved.is_empty() {
            return Ok(DecodeOutcome::NoAudioTrack);
        }
        let mut collector = PcmCollector::new(limits, self.sample_rate, self.channels);
        for chunk in self.interleaved.chunks(4096 * self.channels) {
            if cancel.should_stop() || collector.push_interleaved(chunk) {
                break;
            }
        }
        Ok(DecodeOutcome::Decoded(collector.finish()))
    }

    fn describe(&self) -> String {
        format!(
            "memory ({} frames, {} Hz, {} ch)",
            self.interleaved.len() / self.channels,
            self.sample_rate,
            self.channels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimation_ratio() {
        let limits = DecodeLimits::default();
        assert_eq!(limits.decimation(44_100), 2);
        assert_eq!(limits.decimation(48_000), 2);
        assert_eq!(limits.decimation(22_050), 1);
        assert_eq!(limits.decimation(8_000), 1);
        assert_eq!(limits.decimation(96_000), 4);
    }

    #[test]
    fn collector_averages_and_decimates() {
        let limits = DecodeLimits::new(22_050, 30.0);
        let mut c = PcmCollector::new(&limits, 44_100, 2);
        c.push_interleaved(&[1.0, 0.0, 9.0, 9.0, 0.5, 0.5, 9.0, 9.0]);
        let buf = c.finish();
        assert_eq!(buf.samples(), &[0.5, 0.5]);
        assert_eq!(buf.sample_rate(), 22_050);
    }

    #[test]
    fn decimation_phase_survives_chunk_boundaries() {
        let limits = DecodeLimits::new(22_050, 30.0);
        let mut c = PcmCollector::new(&limits, 44_100, 1);
        c.push_interleaved(&[1.0, 2.0, 3.0]);
        c.push_interleaved(&[4.0, 5.0]);
        assert_eq!(c.finish().samples(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn collector_stops_at_cap() {
        let limits = DecodeLimits {
            target_rate: 100,
            max_samples: 3,
        };
        let mut c = PcmCollector::new(&limits, 100, 1);
        assert!(!c.push_interleaved(&[0.1, 0.2]));
        assert!(c.push_interleaved(&[0.3, 0.4, 0.5]));
        assert_eq!(c.finish().len(), 3);
    }

    #[test]
    fn empty_memory_source_has_no_track() {
        let mut src = MemorySource::mono(Vec::new(), 22_050);
        let out = src.decode(&DecodeLimits::default(), &CancelToken::new());
        assert!(matches!(out, Ok(DecodeOutcome::NoAudioTrack)));
    }

    #[test]
    fn cancelled_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.should_stop());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.should_stop());
    }

    #[test]
    fn zero_timeout_passes_immediately() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.deadline_passed());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn buffer_duration() {
        let buf = PcmBuffer::new(vec![0.0; 11_025], 22_050);
        assert!((buf.duration_secs() - 0.5).abs() < 1e-6);
    }
}
