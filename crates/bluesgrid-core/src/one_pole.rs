//! One-pole smoothing filter used for instrument tone shaping.
//!
//! ```text
//! y[n] = y[n-1] + alpha * (x[n] - y[n-1])
//! ```
//!
//! The filter can be configured either from a cutoff in Hz
//! (`alpha = 1 - exp(-2π f / sr)`) or directly from the smoothing factor
//! `alpha`, which is how the instrument models dial in their voicing.
//! The complementary highpass (`x - y`) comes from the same state.
//!
//! ```rust
//! use bluesgrid_core::OnePole;
//!
//! let mut lp = OnePole::new(48000.0, 300.0);
//! let y = lp.process(1.0);
//! assert!(y > 0.0 && y < 1.0);
//! ```

use crate::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass with a complementary highpass tap.
///
/// # Invariants
///
/// - `alpha` is always in (0, 1]
/// - `state` is flushed to zero when below 1e-20
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    alpha: f32,
}

impl OnePole {
    /// Create a lowpass with a cutoff in Hz.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            alpha: 1.0,
        };
        filter.set_frequency(sample_rate, freq_hz);
        filter
    }

    /// Create a smoother from a raw smoothing factor in (0, 1].
    pub fn with_alpha(alpha: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            alpha: 1.0,
        };
        filter.set_alpha(alpha);
        filter
    }

    /// Set the cutoff frequency in Hz.
    pub fn set_frequency(&mut self, sample_rate: f32, freq_hz: f32) {
        let sr = sample_rate.max(1.0);
        let f = freq_hz.clamp(0.0, sr * 0.5);
        self.set_alpha(1.0 - expf(-core::f32::consts::TAU * f / sr));
    }

    /// Set the smoothing factor directly. 1.0 passes the input unchanged.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(1e-6, 1.0);
    }

    /// Current smoothing factor.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Lowpass one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(self.state + self.alpha * (input - self.state));
        self.state
    }

    /// Highpass one sample (input minus the lowpassed signal).
    #[inline]
    pub fn process_highpass(&mut self, input: f32) -> f32 {
        input - self.process(input)
    }

    /// Start the filter settled at `value`, so the first output equals it.
    pub fn prime(&mut self, value: f32) {
        self.state = flush_denormal(value);
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
