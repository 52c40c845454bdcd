//! Low-frequency oscillator for vibrato, Leslie and auto-wah sweeps.

use core::f32::consts::TAU;
use libm::sinf;

/// LFO shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Sine.
    #[default]
    Sine,
    /// Symmetric triangle.
    Triangle,
}

/// Unit-phase LFO producing bipolar output in [-1, 1].
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Sine LFO at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            phase: 0.0,
            phase_inc: freq_hz.max(0.0) / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
        }
    }

    /// Change rate without resetting phase.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz.max(0.0) / self.sample_rate;
    }

    /// Current rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Phase in [0, 1).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Return to phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Next bipolar value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * TAU),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= libm::floorf(self.phase);
        }
        out
    }

    /// Next value mapped to [0, 1].
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next() + 1.0) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_bounded() {
        for wave in [LfoWaveform::Sine, LfoWaveform::Triangle] {
            let mut lfo = Lfo::new(48000.0, 7.0);
            lfo.set_waveform(wave);
            for _ in 0..48000 {
                let v = lfo.next();
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn completes_one_cycle_per_period() {
        let mut lfo = Lfo::new(1000.0, 10.0);
        for _ in 0..100 {
            lfo.next();
        }
        assert!(lfo.phase() < 1e-3 || lfo.phase() > 1.0 - 1e-3);
    }

    #[test]
    fn unipolar_range() {
        let mut lfo = Lfo::new(48000.0, 3.5);
        for _ in 0..20000 {
            let v = lfo.next_unipolar();
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
