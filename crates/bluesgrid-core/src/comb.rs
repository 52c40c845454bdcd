//! Damped feedback comb filter, the body of the reverb.

use crate::InterpolatedDelay;
use crate::flush_denormal;

/// Feedback comb with a one-pole lowpass in the loop.
///
/// ```text
/// y[n]   = buf[n - N]
/// s[n]   = y[n]·(1 - damp) + s[n-1]·damp
/// buf[n] = x[n] + s[n]·feedback
/// ```
///
/// `feedback` is clamped below 1 so the loop always decays.
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: InterpolatedDelay,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl CombFilter {
    /// Comb with a loop length of `delay_samples`.
    pub fn new(delay_samples: usize) -> Self {
        Self {
            delay: InterpolatedDelay::new(delay_samples),
            feedback: 0.5,
            damp: 0.2,
            store: 0.0,
        }
    }

    /// Loop gain, clamped to [0, 0.98].
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    /// Current loop gain.
    #[inline]
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// High-frequency damping in [0, 1].
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.delay.read((self.delay.capacity() - 1) as f32);
        self.store = flush_denormal(output * (1.0 - self.damp) + self.store * self.damp);
        self.delay.write(input + self.store * self.feedback);
        output
    }

    /// Clear the loop.
    pub fn clear(&mut self) {
        self.delay.clear();
        self.store = 0.0;
    }

    /// Loop length in samples.
    pub fn len(&self) -> usize {
        self.delay.capacity()
    }

    /// Always false; a comb holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }
}
