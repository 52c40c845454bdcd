//! FM-plus-noise drum synthesis.
//!
//! A drum voice is selected by the frequency it is triggered at, so the
//! same note-on path that plays melodic instruments also plays the kit.

use core::f32::consts::TAU;
use libm::sinf;

use crate::params::DrumParams;

/// Pads on the drum grid and the trigger frequency each one sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrumPad {
    /// Bass drum.
    Kick,
    /// Snare.
    Snare,
    /// Closed hi-hat.
    HiHatClosed,
    /// Open hi-hat.
    HiHatOpen,
    /// High tom.
    TomHigh,
    /// Mid tom.
    TomMid,
    /// Floor tom.
    TomLow,
    /// Crash cymbal.
    Crash,
    /// Ride cymbal.
    Ride,
}

impl DrumPad {
    /// Every pad in grid order.
    pub const ALL: [Self; 9] = [
        Self::Kick,
        Self::Snare,
        Self::HiHatClosed,
        Self::HiHatOpen,
        Self::TomHigh,
        Self::TomMid,
        Self::TomLow,
        Self::Crash,
        Self::Ride,
    ];

    /// Trigger frequency in Hz.
    pub const fn frequency(self) -> f32 {
        match self {
            Self::Kick => 60.0,
            Self::Snare => 280.0,
            Self::HiHatClosed => 900.0,
            Self::HiHatOpen => 750.0,
            Self::TomHigh => 180.0,
            Self::TomMid => 150.0,
            Self::TomLow => 100.0,
            Self::Crash => 500.0,
            Self::Ride => 600.0,
        }
    }
}

/// Drum model chosen from the trigger frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrumKind {
    /// Below 100 Hz.
    Kick,
    /// 100 to 250 Hz.
    Tom,
    /// 250 to 350 Hz.
    Snare,
    /// 350 to 700 Hz.
    Cymbal,
    /// 700 Hz and up.
    HiHat,
}

/// Synthesis constants for one drum model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrumVoicing {
    /// Per-sample pitch multiplier during the hit (1.0 = no drop).
    pub pitch_decay: f32,
    /// Share of noise in the mix.
    pub noise: f32,
    /// FM modulator ratio.
    pub fm: f32,
    /// Per-sample amplitude multiplier.
    pub decay: f32,
}

impl DrumKind {
    /// Pick the model for a trigger frequency.
    pub fn from_frequency(freq: f32) -> Self {
        if freq < 100.0 {
            Self::Kick
        } else if freq < 250.0 {
            Self::Tom
        } else if freq < 350.0 {
            Self::Snare
        } else if freq < 700.0 {
            Self::Cymbal
        } else {
            Self::HiHat
        }
    }

    /// Synthesis constants.
    pub const fn voicing(self) -> DrumVoicing {
        match self {
            Self::Kick => DrumVoicing {
                pitch_decay: 0.995,
                noise: 0.05,
                fm: 4.0,
                decay: 0.9995,
            },
            Self::Tom => DrumVoicing {
                pitch_decay: 0.998,
                noise: 0.1,
                fm: 2.0,
                decay: 0.999,
            },
            Self::Snare => DrumVoicing {
                pitch_decay: 0.99,
                noise: 0.6,
                fm: 1.5,
                decay: 0.9985,
            },
            Self::Cymbal => DrumVoicing {
                pitch_decay: 1.0,
                noise: 0.85,
                fm: 0.8,
                decay: 0.9997,
            },
            Self::HiHat => DrumVoicing {
                pitch_decay: 1.0,
                noise: 0.9,
                fm: 0.5,
                decay: 0.9992,
            },
        }
    }

    /// Mix level for this model from the kit settings.
    pub fn level(self, params: &DrumParams) -> f32 {
        let level = match self {
            Self::Kick => params.kick,
            Self::Tom => params.tom,
            Self::Snare => params.snare,
            Self::Cymbal | Self::HiHat => params.hihat,
        };
        level * 1.25
    }

    fn has_pitch_drop(self) -> bool {
        matches!(self, Self::Kick | Self::Tom)
    }

    fn is_metallic(self) -> bool {
        matches!(self, Self::Cymbal | Self::HiHat)
    }
}

/// Per-voice drum state, re-armed on every hit.
#[derive(Debug, Clone)]
pub struct DrumState {
    mod_phase: f32,
    decay: f32,
    pitch_scale: f32,
    noise_lp: f32,
}

impl Default for DrumState {
    fn default() -> Self {
        Self {
            mod_phase: 0.0,
            decay: 1.0,
            pitch_scale: 1.0,
            noise_lp: 0.0,
        }
    }
}

impl DrumState {
    /// Re-arm for a new hit.
    pub fn trigger(&mut self) {
        *self = Self::default();
    }

    /// Current pitch multiplier from the pitch drop.
    #[inline]
    pub fn pitch_scale(&self) -> f32 {
        self.pitch_scale
    }

    /// Render one sample. `phase` is the carrier phase in radians, `inc`
    /// the carrier increment for this sample, `noise` white noise in [-1, 1].
    #[inline]
    pub fn render(
        &mut self,
        kind: DrumKind,
        phase: f32,
        inc: f32,
        noise: f32,
        params: &DrumParams,
    ) -> f32 {
        let v = kind.voicing();

        self.decay = (self.decay * v.decay).max(0.001);

        let fm = sinf(self.mod_phase * v.fm) * self.decay * 2.0;
        let carrier = sinf(phase + fm);

        self.mod_phase += inc * 1.5;
        if self.mod_phase >= TAU {
            self.mod_phase -= TAU;
        }

        if kind.has_pitch_drop() && self.decay > 0.5 {
            self.pitch_scale *= v.pitch_decay;
        }

        let noise = if kind.is_metallic() {
            let prev = self.noise_lp;
            self.noise_lp = noise * 0.5 + prev * 0.5;
            (noise - self.noise_lp) * 2.5
        } else {
            noise
        };

        let mut out = (carrier * (1.0 - v.noise) + noise * v.noise) * self.decay;
        if kind == DrumKind::Kick && self.decay > 0.7 {
            out *= 1.8;
        }
        out * kind.level(params)
    }
}
