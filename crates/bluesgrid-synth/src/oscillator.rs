//! Per-voice tone generators: basic waveforms and instrument models.
//!
//! An [`Oscillator`] owns the phase and the small amount of per-note state
//! the instrument models need (pickup smoothing, string energy, drum hit
//! state, noise seed). Shared coloration such as amp distortion, wah and
//! reverb happens later on the instrument bus, see [`crate::effects`].

use core::f32::consts::{PI, TAU};
use libm::sinf;

use crate::drums::{DrumKind, DrumState};
use crate::params::{BassParams, GuitarParams, InstrumentKind, InstrumentSettings, OrganParams};

/// Basic synth waveforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine.
    Sine,
    /// Rising ramp, band-limited with PolyBLEP.
    #[default]
    Saw,
    /// 50% pulse, band-limited with PolyBLEP.
    Square,
    /// Symmetric triangle.
    Triangle,
}

impl Waveform {
    /// Sample at unit phase `t` in [0, 1) with phase increment `dt`.
    #[inline]
    pub fn sample(self, t: f32, dt: f32) -> f32 {
        match self {
            Self::Sine => sinf(t * TAU),
            Self::Saw => 2.0 * t - 1.0 - poly_blep(t, dt),
            Self::Square => {
                let naive = if t < 0.5 { 1.0 } else { -1.0 };
                let falling = if t < 0.5 { t + 0.5 } else { t - 0.5 };
                naive + poly_blep(t, dt) - poly_blep(falling, dt)
            }
            Self::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
        }
    }
}

/// 2-point PolyBLEP residual for a unit step at phase 0.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let x = t / dt;
        2.0 * x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + 2.0 * x + 1.0
    } else {
        0.0
    }
}

/// Sound source selected by `setWaveType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instrument {
    /// Tonewheel organ.
    Organ,
    /// Lead synth with a basic waveform.
    Synth(Waveform),
    /// Overdriven electric guitar.
    Guitar,
    /// Electric bass.
    Bass,
    /// Drum kit (drum chosen by frequency).
    Drums,
}

impl Default for Instrument {
    fn default() -> Self {
        Self::Synth(Waveform::Saw)
    }
}

impl Instrument {
    /// Map a control-surface wave-type code. Unknown codes select the saw lead.
    ///
    /// | code | instrument |
    /// |------|------------|
    /// | 0 | organ |
    /// | 1 | synth saw |
    /// | 2 | drums |
    /// | 3 | bass |
    /// | 4 | guitar |
    /// | 5 | synth square |
    /// | 6 | synth triangle |
    /// | 7 | synth sine |
    pub fn from_wave_type(code: i32) -> Self {
        match code {
            0 => Self::Organ,
            2 => Self::Drums,
            3 => Self::Bass,
            4 => Self::Guitar,
            5 => Self::Synth(Waveform::Square),
            6 => Self::Synth(Waveform::Triangle),
            7 => Self::Synth(Waveform::Sine),
            _ => Self::Synth(Waveform::Saw),
        }
    }

    /// Inverse of [`Instrument::from_wave_type`].
    pub fn wave_type(self) -> i32 {
        match self {
            Self::Organ => 0,
            Self::Synth(Waveform::Saw) => 1,
            Self::Drums => 2,
            Self::Bass => 3,
            Self::Guitar => 4,
            Self::Synth(Waveform::Square) => 5,
            Self::Synth(Waveform::Triangle) => 6,
            Self::Synth(Waveform::Sine) => 7,
        }
    }

    /// The bus this instrument feeds.
    pub fn kind(self) -> InstrumentKind {
        match self {
            Self::Organ => InstrumentKind::Organ,
            Self::Synth(_) => InstrumentKind::Synth,
            Self::Guitar => InstrumentKind::Guitar,
            Self::Bass => InstrumentKind::Bass,
            Self::Drums => InstrumentKind::Drums,
        }
    }

    /// Plucked instruments hold their level through the envelope and use it
    /// mostly to end the note.
    pub fn is_plucked(self) -> bool {
        matches!(self, Self::Guitar | Self::Bass)
    }
}

/// Drawbar partials as (frequency multiple, weight). The first four are the
/// foundation drawbars, the rest are scaled by the drawbar control.
const ORGAN_PARTIALS: [(f32, f32); 9] = [
    (0.5, 1.0),
    (1.5, 1.0),
    (1.0, 1.0),
    (2.0, 1.0),
    (3.0, 0.6),
    (4.0, 0.6),
    (5.0, 0.3),
    (6.0, 0.3),
    (8.0, 0.2),
];

/// Phase-accumulating tone generator for one voice.
#[derive(Debug, Clone)]
pub struct Oscillator {
    sample_rate: f32,
    phase: f32,
    tone: f32,
    tone2: f32,
    string_energy: f32,
    drum: DrumState,
    noise_state: u32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Create an oscillator at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            phase: 0.0,
            tone: 0.0,
            tone2: 0.0,
            string_energy: 1.0,
            drum: DrumState::default(),
            noise_state: 0x1234_5678,
        }
    }

    /// Seed the noise generator so voices do not share one noise stream.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.noise_state = seed.max(1);
        self
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
    }

    /// Current phase in radians, in [0, 2π).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Restart for a new note: phase, filters, string energy and drum hit.
    pub fn trigger(&mut self) {
        self.phase = 0.0;
        self.tone = 0.0;
        self.tone2 = 0.0;
        self.string_energy = 1.0;
        self.drum.trigger();
    }

    /// Render one sample of `instrument` at `freq` Hz and advance the phase.
    ///
    /// Non-positive or non-finite frequencies produce silence.
    #[inline]
    pub fn render(&mut self, freq: f32, instrument: Instrument, settings: &InstrumentSettings) -> f32 {
        if !(freq > 0.0 && freq.is_finite()) {
            return 0.0;
        }

        let mut inc = TAU * freq / self.sample_rate;
        let sample = match instrument {
            Instrument::Organ => self.organ(&settings.organ),
            Instrument::Synth(wave) => wave.sample(self.phase / TAU, inc / TAU),
            Instrument::Guitar => self.guitar(&settings.guitar),
            Instrument::Bass => self.bass(&settings.bass),
            Instrument::Drums => {
                inc *= self.drum.pitch_scale();
                let noise = self.next_noise();
                self.drum.render(DrumKind::from_frequency(freq), self.phase, inc, noise, &settings.drums)
            }
        };

        self.phase = wrap_phase(self.phase + inc);
        sample
    }

    fn organ(&self, params: &OrganParams) -> f32 {
        let upper = 0.25 + 0.75 * params.drawbar;
        let mut sum = 0.0;
        for (i, &(mult, weight)) in ORGAN_PARTIALS.iter().enumerate() {
            let level = if i < 4 { weight } else { weight * upper };
            sum += level * sinf(self.phase * mult);
        }
        sum / 3.0
    }

    fn guitar(&mut self, params: &GuitarParams) -> f32 {
        let p = self.phase;
        let saw = p / PI - 1.0;
        let pulse = if p < PI * 0.65 { 1.0 } else { -1.0 };
        let body = 0.6 * saw + 0.4 * pulse;

        let overtones = 0.5 * sinf(p * 2.0)
            + 0.35 * sinf(p * 3.0)
            + 0.25 * sinf(p * 4.0)
            + 0.15 * sinf(p * 5.0)
            + 0.1 * sinf(p * 6.0);

        let raw = 0.65 * body + 0.35 * overtones;

        // Pickup: brighter as the gain goes up.
        let alpha = 0.6 + params.gain * 0.2;
        self.tone += alpha * (raw - self.tone);
        let mut pickup = self.tone + 0.15 * sinf(p * 0.5);

        // Amp feedback keeps the string ringing.
        let feedback = 0.1 + params.sustain * 0.2;
        pickup += feedback * self.string_energy * (sinf(p) + 0.5 * sinf(p * 2.0));

        let decay = 0.9995 + params.sustain * 0.00045;
        if self.string_energy > 0.3 + params.sustain * 0.4 {
            self.string_energy *= decay;
        }
        self.string_energy = self.string_energy.max(0.3 + params.sustain * 0.5);

        pickup
    }

    fn bass(&mut self, params: &BassParams) -> f32 {
        let p = self.phase;
        let body = sinf(p)
            + 0.4 * sinf(p * 0.5)
            + 0.3 * (p / PI - 1.0)
            + 0.2 * if p < PI { 1.0 } else { -1.0 };
        let overtones = 0.25 * sinf(p * 2.0) + 0.1 * sinf(p * 3.0);
        let raw = body + overtones * 0.3;

        self.tone += 0.2 * (raw - self.tone);
        self.tone2 += (0.05 + params.tone * 0.17) * (self.tone - self.tone2);

        let mid = 0.1 * (self.tone - self.tone2);
        let pluck = 1.0 + self.string_energy * (0.1 + params.attack * 2.0);

        self.string_energy = (self.string_energy * 0.9998).max(params.sustain);

        (self.tone2 + mid) * pluck
    }

    #[inline]
    fn next_noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }
}

/// Wrap a phase in radians into [0, 2π).
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    if (0.0..TAU).contains(&phase) {
        phase
    } else {
        let wrapped = phase - TAU * libm::floorf(phase / TAU);
        if wrapped >= TAU { 0.0 } else { wrapped }
    }
}
