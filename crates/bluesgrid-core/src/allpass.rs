//! Schroeder allpass diffuser.

use crate::InterpolatedDelay;
use crate::flush_denormal;

/// Schroeder allpass: flat magnitude, smeared phase.
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    delay: InterpolatedDelay,
    gain: f32,
}

impl AllpassFilter {
    /// Allpass with a loop of `delay_samples`.
    pub fn new(delay_samples: usize) -> Self {
        Self {
            delay: InterpolatedDelay::new(delay_samples),
            gain: 0.5,
        }
    }

    /// Diffusion gain, clamped to (-0.95, 0.95).
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(-0.95, 0.95);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.read((self.delay.capacity() - 1) as f32);
        let v = flush_denormal(input + delayed * self.gain);
        self.delay.write(v);
        delayed - self.gain * v
    }

    /// Clear the loop.
    pub fn clear(&mut self) {
        self.delay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_energy_is_preserved() {
        let mut ap = AllpassFilter::new(37);
        ap.set_gain(0.7);
        let mut energy = 0.0f32;
        for i in 0..20000 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let y = ap.process(x);
            assert!(y.is_finite());
            energy += y * y;
        }
        assert!((energy - 1.0).abs() < 0.01, "energy {energy}");
    }

    #[test]
    fn clear_silences() {
        let mut ap = AllpassFilter::new(5);
        for _ in 0..10 {
            ap.process(1.0);
        }
        ap.clear();
        for _ in 0..10 {
            assert_eq!(ap.process(0.0), 0.0);
        }
    }
}
