//! Topology-preserving state variable filter.
//!
//! Trapezoidal-integrator SVF after Zavalishin, "The Art of VA Filter
//! Design", chapter 3. Cutoff can be swept per sample without zipper
//! artifacts, which is what the wah needs.

use core::f32::consts::PI;
use libm::tanf;

use crate::Effect;
use crate::flush_denormal;

/// Which SVF response [`Effect::process`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfOutput {
    /// 12 dB/oct lowpass.
    #[default]
    Lowpass,
    /// 12 dB/oct highpass.
    Highpass,
    /// Bandpass with peak gain equal to Q.
    Bandpass,
    /// Bandpass scaled to unity gain at the center frequency.
    NormalizedBandpass,
}

/// Two-integrator TPT state variable filter.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    ic1eq: f32,
    ic2eq: f32,
    g: f32,
    k: f32,
    sample_rate: f32,
    cutoff: f32,
    q: f32,
    output: SvfOutput,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a 1 kHz lowpass with Butterworth Q.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate: sample_rate.max(1.0),
            cutoff: 1000.0,
            q: 0.707,
            output: SvfOutput::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff in Hz, clamped to [20, 0.49·sr].
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set Q, clamped to [0.5, 20].
    pub fn set_q(&mut self, q: f32) {
        self.q = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// Current Q.
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Select the response returned by [`Effect::process`].
    pub fn set_output(&mut self, output: SvfOutput) {
        self.output = output;
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.q;
    }

    /// Run one sample and return `(lowpass, highpass, bandpass)`.
    #[inline]
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        (v2, input - self.k * v1 - v2, v1)
    }
}

impl Effect for StateVariableFilter {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (lp, hp, bp) = self.process_all(input);
        match self.output {
            SvfOutput::Lowpass => lp,
            SvfOutput::Highpass => hp,
            SvfOutput::Bandpass => bp,
            SvfOutput::NormalizedBandpass => bp * self.k,
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.set_cutoff(self.cutoff);
    }

    fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::sinf;

    fn rms_response(svf: &mut StateVariableFilter, freq: f32) -> f32 {
        let sr = 48000.0;
        svf.reset();
        let mut sum = 0.0;
        let n = 9600;
        for i in 0..n {
            let x = sinf(2.0 * PI * freq * i as f32 / sr);
            let y = svf.process(x);
            if i >= n / 2 {
                sum += y * y;
            }
        }
        libm::sqrtf(sum / (n / 2) as f32)
    }

    #[test]
    fn lowpass_passes_low_rejects_high() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(500.0);
        let low = rms_response(&mut svf, 100.0);
        let high = rms_response(&mut svf, 8000.0);
        assert!(low > 0.6, "low band rms {low}");
        assert!(high < 0.05, "high band rms {high}");
    }

    #[test]
    fn normalized_bandpass_peaks_near_unity() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_output(SvfOutput::NormalizedBandpass);
        svf.set_cutoff(1000.0);
        svf.set_q(6.0);
        let center = rms_response(&mut svf, 1000.0);
        let off = rms_response(&mut svf, 4000.0);
        assert!((center - core::f32::consts::FRAC_1_SQRT_2).abs() < 0.05, "center {center}");
        assert!(off < center * 0.3);
    }

    #[test]
    fn cutoff_is_clamped() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1.0e6);
        assert!(svf.cutoff() <= 48000.0 * 0.49);
        svf.set_cutoff(-5.0);
        assert_eq!(svf.cutoff(), 20.0);
    }
}
