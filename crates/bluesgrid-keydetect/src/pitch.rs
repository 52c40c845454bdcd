//! Bass pitch tracking by normalized autocorrelation.
//!
//! The whole signal is low-passed once (single-pole, ~300 Hz) to keep the
//! bass register. It is then cut into overlapping windows. Each window
//! passes an energy gate, then autocorrelation over the 40–300 Hz lag range
//! picks the period:
//!
//! ```text
//! r(τ) = Σ_{i < N/2} x[i]·x[i+τ] / Σ_{i < N/2} x[i]²
//! ```
//!
//! Windows whose best `r` is under the correlation threshold are treated as
//! unvoiced. Otherwise the lag with the highest `r` is the period, refined by
//! parabolic interpolation and mapped to its nearest pitch class.
//!
//! A clean tone correlates almost equally well at two or three periods, so
//! the strict maximum can land on a multiple of the period. That keeps the
//! pitch class for even multiples but not for three periods (a fifth below).
//! [`TrackerConfig::prefer_shortest_period`] instead takes the shortest-lag
//! peak within 5% of the best. It is off by default: on notes with a strong
//! third harmonic it reports the harmonic instead of the fundamental.

use bluesgrid_core::OnePole;
use tracing::debug;

use crate::histogram::NoteHistogram;
use crate::key::Note;
use crate::source::CancelToken;

/// With `prefer_shortest_period`, a peak counts as the period when it
/// reaches this share of the best.
pub const SHORTEST_PERIOD_RATIO: f32 = 0.95;

/// Pitch tracker tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Analysis window length in samples.
    pub window_size: usize,
    /// Window advance in samples.
    pub hop_size: usize,
    /// Bass low-pass cutoff in Hz.
    pub lowpass_cutoff_hz: f32,
    /// Windows at or below this mean-square energy are skipped.
    pub energy_threshold: f32,
    /// Windows whose best normalized correlation is below this are unvoiced.
    pub correlation_threshold: f32,
    /// Lowest detectable fundamental in Hz.
    pub min_frequency_hz: f32,
    /// Highest detectable fundamental in Hz.
    pub max_frequency_hz: f32,
    /// Zero-lag energy below which a window is treated as silent.
    pub silence_floor: f32,
    /// Take the shortest-lag peak near the maximum instead of the maximum.
    pub prefer_shortest_period: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_size: 4096,
            hop_size: 2048,
            lowpass_cutoff_hz: 300.0,
            energy_threshold: 0.0005,
            correlation_threshold: 0.4,
            min_frequency_hz: 40.0,
            max_frequency_hz: 300.0,
            silence_floor: 0.0001,
            prefer_shortest_period: false,
        }
    }
}

/// Window counts and the histogram from one tracking pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackSummary {
    /// Pitch classes of the accepted windows.
    pub histogram: NoteHistogram,
    /// Windows examined.
    pub windows: usize,
    /// Windows above the energy gate.
    pub voiced_windows: usize,
    /// Windows that produced a pitch.
    pub pitched_windows: usize,
    /// True when cancellation stopped the pass early.
    pub interrupted: bool,
    /// True when the token's deadline stopped the pass early. The histogram
    /// holds the windows tracked until then.
    pub deadline_hit: bool,
}

/// Autocorrelation pitch tracker for one sample rate.
#[derive(Clone, Debug)]
pub struct PitchTracker {
    config: TrackerConfig,
    sample_rate: u32,
}

impl PitchTracker {
    /// Tracker for PCM at `sample_rate`.
    pub fn new(config: TrackerConfig, sample_rate: u32) -> Self {
        let mut config = config;
        config.window_size = config.window_size.max(64);
        config.hop_size = config.hop_size.max(1);
        config.min_frequency_hz = config.min_frequency_hz.max(1.0);
        config.max_frequency_hz = config.max_frequency_hz.max(config.min_frequency_hz);
        Self {
            config,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Sample rate the tracker expects.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Single-pole RC low-pass of the whole signal. The first output equals
    /// the first input.
    pub fn lowpass(&self, samples: &[f32]) -> Vec<f32> {
        let Some(&first) = samples.first() else {
            return Vec::new();
        };
        let rc = 1.0 / (core::f32::consts::TAU * self.config.lowpass_cutoff_hz.max(1.0));
        let dt = 1.0 / self.sample_rate as f32;
        let mut lp = OnePole::with_alpha(dt / (rc + dt));
        lp.prime(first);
        samples.iter().map(|&x| lp.process(x)).collect()
    }

    /// Fundamental of one window in Hz, or `None` if silent or unvoiced.
    pub fn estimate_frequency(&self, window: &[f32]) -> Option<f32> {
        let n = window.len();
        let half = n / 2;
        let sr = self.sample_rate as f32;
        let min_period = ((sr / self.config.max_frequency_hz) as usize).max(1);
        let max_period = ((sr / self.config.min_frequency_hz) as usize).min(half);
        if max_period < min_period + 2 {
            return None;
        }

        let r0: f32 = window[..half].iter().map(|x| x * x).sum();
        if r0 < self.config.silence_floor {
            return None;
        }

        let values: Vec<f32> = (min_period..=max_period)
            .map(|lag| autocorrelation(window, lag) / r0)
            .collect();

        let mut best = 0.0f32;
        let mut best_idx = None;
        for (i, &v) in values.iter().enumerate() {
            if v > best {
                best = v;
                best_idx = Some(i);
            }
        }
        let best_idx = best_idx?;
        if best < self.config.correlation_threshold {
            return None;
        }

        let idx = if self.config.prefer_shortest_period {
            let floor = best * SHORTEST_PERIOD_RATIO;
            (0..values.len())
                .find(|&i| values[i] >= floor && is_local_peak(&values, i))
                .unwrap_or(best_idx)
        } else {
            best_idx
        };

        let period = min_period + idx;
        let mut refined = period as f32;
        if period > min_period && period < max_period - 1 {
            let (y0, y1, y2) = (values[idx - 1], values[idx], values[idx + 1]);
            let shift = (y0 - y2) / (2.0 * (y0 - 2.0 * y1 + y2));
            if shift.is_finite() && shift.abs() < 1.0 {
                refined += shift;
            }
        }
        Some(sr / refined)
    }

    /// Track the whole signal.
    pub fn track(&self, samples: &[f32]) -> TrackSummary {
        self.track_with(samples, &CancelToken::new())
    }

    /// Track the whole signal in temporal order, stopping between windows
    /// if `cancel` is cancelled or its deadline passes.
    pub fn track_with(&self, samples: &[f32], cancel: &CancelToken) -> TrackSummary {
        let filtered = self.lowpass(samples);
        let size = self.config.window_size;
        let mut summary = TrackSummary::default();

        let mut pos = 0;
        while pos + size < filtered.len() {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            if cancel.deadline_passed() {
                summary.deadline_hit = true;
                break;
            }
            let window = &filtered[pos..pos + size];
            summary.windows += 1;

            let energy = window.iter().map(|x| x * x).sum::<f32>() / size as f32;
            if energy > self.config.energy_threshold {
                summary.voiced_windows += 1;
                if let Some(note) = self
                    .estimate_frequency(window)
                    .and_then(frequency_to_pitch_class)
                {
                    summary.histogram.increment(note);
                    summary.pitched_windows += 1;
                }
            }
            pos += self.config.hop_size;
        }

        debug!(
            windows = summary.windows,
            voiced = summary.voiced_windows,
            pitched = summary.pitched_windows,
            "pitch tracking finished"
        );
        summary
    }
}

/// Raw autocorrelation over the first half of the window.
fn autocorrelation(window: &[f32], lag: usize) -> f32 {
    let half = window.len() / 2;
    let end = half.min(window.len().saturating_sub(lag));
    window[..end]
        .iter()
        .zip(&window[lag..lag + end])
        .map(|(a, b)| a * b)
        .sum()
}

fn is_local_peak(values: &[f32], i: usize) -> bool {
    let left = i == 0 || values[i] >= values[i - 1];
    let right = i + 1 == values.len() || values[i] >= values[i + 1];
    left && right
}

/// Nearest equal-tempered pitch class: `round(69 + 12·log2(f/440)) mod 12`.
pub fn frequency_to_pitch_class(freq: f32) -> Option<Note> {
    if !(freq > 0.0 && freq.is_finite()) {
        return None;
    }
    let midi = (69.0 + 12.0 * (freq / 440.0).log2()).round() as i32;
    Some(Note::from_semitone(midi))
}
