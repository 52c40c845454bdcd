//! Effect stages and the per-instrument chains built from them.
//!
//! Every instrument kind owns exactly one chain, shared by all voices that
//! play it. Chains are reconfigured when settings change (never per
//! voice) and process the summed instrument bus one sample at a time.
//!
//! | Instrument | Chain |
//! |------------|-------|
//! | Guitar | preamp → [`Distortion`] → output gain → [`Wah`] → [`Reverb`] → limiter |
//! | Organ | overdrive → chorus ([`Vibrato`]) → [`Leslie`] |
//! | Synth | resonant lowpass → chorus ([`Vibrato`]) |
//! | Bass | compressor-style saturation → limiter |
//! | Drums | saturation |

use bluesgrid_core::{
    AllpassFilter, CombFilter, Effect, InterpolatedDelay, Lfo, StateVariableFilter, SvfOutput,
    wet_dry_mix,
};
use libm::{expf, powf, tanhf};

use crate::params::{
    BassParams, GuitarParams, InstrumentKind, InstrumentSettings, OrganParams, SynthParams,
    WahMode, WahState,
};

/// Tube-amp style distortion.
///
/// Asymmetric exponential clip, a second tanh gain stage, an odd-harmonic
/// layer, then a final tanh. `amount` in [0, 1] scales both the effective
/// drive and the second-stage gain.
#[derive(Debug, Clone)]
pub struct Distortion {
    drive: f32,
    amount: f32,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            drive: 20.0,
            amount: 0.5,
        }
    }
}

impl Distortion {
    /// Base drive before the amount scaling.
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.max(0.0);
    }

    /// Distortion amount in [0, 1].
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }
}

impl Effect for Distortion {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let x = input * self.drive * (0.5 + self.amount * 1.5);
        let stage1 = if x > 0.0 {
            1.0 - expf(-x * 1.5)
        } else {
            -1.0 + expf(x * 1.2)
        };
        let stage2 = tanhf(stage1 * (2.0 + self.amount * 2.0));
        let harmonics = stage2 + 0.3 * tanhf(stage2 * 3.0);
        tanhf(harmonics * 1.2)
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {}
}

/// Wah pedal: a resonant bandpass swept between heel and toe.
///
/// Center frequency is `MIN_HZ · (MAX_HZ / MIN_HZ)^position`. When the
/// pedal is off the input passes through untouched.
#[derive(Debug, Clone)]
pub struct Wah {
    filter: StateVariableFilter,
    sweep: Lfo,
    state: WahState,
}

impl Wah {
    /// Heel position center frequency.
    pub const MIN_HZ: f32 = 400.0;
    /// Toe position center frequency.
    pub const MAX_HZ: f32 = 2200.0;
    /// Bandpass Q.
    pub const Q: f32 = 6.0;
    /// Auto-wah sweep rate.
    pub const AUTO_RATE_HZ: f32 = 3.5;

    /// Create a bypassed wah.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = StateVariableFilter::new(sample_rate);
        filter.set_output(SvfOutput::NormalizedBandpass);
        filter.set_q(Self::Q);
        Self {
            filter,
            sweep: Lfo::new(sample_rate, Self::AUTO_RATE_HZ),
            state: WahState::default(),
        }
    }

    /// Center frequency for a pedal position in [0, 1].
    pub fn center_frequency(position: f32) -> f32 {
        Self::MIN_HZ * powf(Self::MAX_HZ / Self::MIN_HZ, position.clamp(0.0, 1.0))
    }

    /// Apply a new pedal state. Disengaging clears the filter.
    pub fn set_state(&mut self, state: WahState) {
        if self.state.enabled && !state.enabled {
            self.filter.reset();
        }
        if !self.state.enabled && state.enabled {
            self.sweep.reset();
        }
        self.state = state;
    }

    /// Current pedal state.
    pub fn state(&self) -> WahState {
        self.state
    }
}

impl Effect for Wah {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        if !self.state.enabled {
            return input;
        }
        let position = match self.state.mode {
            WahMode::Auto => self.sweep.next_unipolar(),
            WahMode::Manual => self.state.position,
        };
        self.filter.set_cutoff(Self::center_frequency(position));
        let band = self.filter.process(input);
        tanhf((0.75 * band + 0.25 * input) * 1.5)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.filter.set_sample_rate(sample_rate);
        self.sweep = Lfo::new(sample_rate, Self::AUTO_RATE_HZ);
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.sweep.reset();
    }
}

const COMB_BASE_MS: f32 = 50.0;
const COMB_RATIOS: [f32; 3] = [1.0, 0.77, 0.63];
const COMB_FEEDBACK_SCALE: [f32; 3] = [1.0, 0.9, 0.8];
const ALLPASS_MS: [f32; 2] = [5.0, 1.7];

/// Small plate-style reverb: three parallel damped combs into two
/// series allpass diffusers.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: [CombFilter; 3],
    diffusers: [AllpassFilter; 2],
    amount: f32,
}

impl Reverb {
    /// Create a reverb at the given sample rate with the send at zero.
    pub fn new(sample_rate: f32) -> Self {
        let samples = |ms: f32| ((ms * 0.001 * sample_rate) as usize).max(1);
        let combs = COMB_RATIOS.map(|r| {
            let mut comb = CombFilter::new(samples(COMB_BASE_MS * r));
            comb.set_damp(0.2);
            comb
        });
        let diffusers = ALLPASS_MS.map(|ms| {
            let mut ap = AllpassFilter::new(samples(ms));
            ap.set_gain(0.5);
            ap
        });
        let mut reverb = Self {
            combs,
            diffusers,
            amount: 0.0,
        };
        reverb.set_amount(0.0);
        reverb
    }

    /// Reverb amount in [0, 1]: sets both the send level and the tail length.
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
        let decay = 0.3 + self.amount * 0.5;
        for (comb, scale) in self.combs.iter_mut().zip(COMB_FEEDBACK_SCALE) {
            comb.set_feedback(decay * scale);
        }
    }
}

impl Effect for Reverb {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        if self.amount < 0.01 {
            return input;
        }
        let mut wet = self.combs.iter_mut().map(|c| c.process(input)).sum::<f32>() / 3.0;
        for ap in &mut self.diffusers {
            wet = ap.process(wet);
        }
        input * (1.0 - self.amount * 0.5) + wet * self.amount
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let amount = self.amount;
        *self = Self::new(sample_rate);
        self.set_amount(amount);
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for ap in &mut self.diffusers {
            ap.clear();
        }
    }
}

/// LFO-modulated delay: chorus when mixed with the dry signal, vibrato when
/// fully wet.
#[derive(Debug, Clone)]
pub struct Vibrato {
    delay: InterpolatedDelay,
    lfo: Lfo,
    sample_rate: f32,
    rate_hz: f32,
    depth: f32,
    mix: f32,
    last_lfo: f32,
}

const VIBRATO_BASE_MS: f32 = 5.0;
const VIBRATO_DEPTH_MS: f32 = 3.0;

impl Vibrato {
    /// Create a vibrato running at `rate_hz` (5 to 8 Hz is the useful range).
    pub fn new(sample_rate: f32, rate_hz: f32) -> Self {
        Self {
            delay: InterpolatedDelay::from_time(sample_rate, (VIBRATO_BASE_MS + VIBRATO_DEPTH_MS) * 0.001),
            lfo: Lfo::new(sample_rate, rate_hz),
            sample_rate,
            rate_hz,
            depth: 0.0,
            mix: 0.0,
            last_lfo: 0.0,
        }
    }

    /// Modulation depth in [0, 1].
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Wet share in [0, 1].
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// The LFO value used for the most recent sample, in [-1, 1].
    pub fn last_lfo(&self) -> f32 {
        self.last_lfo
    }
}

impl Effect for Vibrato {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.delay.write(input);
        self.last_lfo = self.lfo.next();
        let ms = VIBRATO_BASE_MS + VIBRATO_DEPTH_MS * self.depth * self.last_lfo;
        let wet = self.delay.read(ms * 0.001 * self.sample_rate);
        wet_dry_mix(input, wet, self.mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let (depth, mix) = (self.depth, self.mix);
        *self = Self::new(sample_rate, self.rate_hz);
        self.depth = depth;
        self.mix = mix;
    }

    fn reset(&mut self) {
        self.delay.clear();
        self.lfo.reset();
        self.last_lfo = 0.0;
    }
}

/// Rotary speaker: pitch vibrato plus amplitude tremolo from one rotor LFO.
#[derive(Debug, Clone)]
pub struct Leslie {
    rotor: Vibrato,
    amount: f32,
}

impl Leslie {
    /// Rotor speed ("chorale/tremolo" fast setting).
    pub const ROTOR_HZ: f32 = 6.5;

    /// Create a Leslie with the rotor stopped.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            rotor: Vibrato::new(sample_rate, Self::ROTOR_HZ),
            amount: 0.0,
        }
    }

    /// Depth in [0, 1].
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
        self.rotor.set_depth(self.amount);
        self.rotor.set_mix(self.amount);
    }
}

impl Effect for Leslie {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let moving = self.rotor.process(input);
        let horn = 0.5 + 0.5 * self.rotor.last_lfo();
        moving * (1.0 - 0.3 * self.amount * horn)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.rotor.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.rotor.reset();
    }
}

/// Guitar amp and pedalboard.
#[derive(Debug, Clone)]
pub struct GuitarChain {
    distortion: Distortion,
    wah: Wah,
    reverb: Reverb,
    preamp: f32,
    output: f32,
}

impl GuitarChain {
    fn new(sample_rate: f32) -> Self {
        let mut chain = Self {
            distortion: Distortion::default(),
            wah: Wah::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            preamp: 1.0,
            output: 1.0,
        };
        chain.configure(&GuitarParams::default());
        chain
    }

    /// Apply guitar settings.
    pub fn configure(&mut self, params: &GuitarParams) {
        self.preamp = 2.0 + params.gain * 3.0;
        self.output = 1.3 + params.gain * 0.7;
        self.distortion.set_drive(15.0 + params.distortion * 15.0);
        self.distortion.set_amount(params.distortion);
        self.reverb.set_amount(params.reverb);
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let driven = self.distortion.process(x * self.preamp) * self.output;
        let swept = self.wah.process(driven);
        tanhf(self.reverb.process(swept))
    }

    fn reset(&mut self) {
        self.wah.reset();
        self.reverb.reset();
    }
}

/// Organ preamp, chorus and rotary speaker.
#[derive(Debug, Clone)]
pub struct OrganChain {
    drive: f32,
    chorus: Vibrato,
    leslie: Leslie,
}

impl OrganChain {
    fn new(sample_rate: f32) -> Self {
        let mut chain = Self {
            drive: 1.0,
            chorus: Vibrato::new(sample_rate, 5.0),
            leslie: Leslie::new(sample_rate),
        };
        chain.configure(&OrganParams::default());
        chain
    }

    /// Apply organ settings.
    pub fn configure(&mut self, params: &OrganParams) {
        self.drive = 1.0 + params.overdrive * 5.0;
        self.chorus.set_depth(params.chorus);
        self.chorus.set_mix(params.chorus * 0.5);
        self.leslie.set_amount(params.leslie);
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let warm = tanhf(x * self.drive);
        self.leslie.process(self.chorus.process(warm))
    }

    fn reset(&mut self) {
        self.chorus.reset();
        self.leslie.reset();
    }
}

/// Lead synth filter and chorus.
#[derive(Debug, Clone)]
pub struct SynthChain {
    filter: StateVariableFilter,
    chorus: Vibrato,
}

impl SynthChain {
    fn new(sample_rate: f32) -> Self {
        let mut chain = Self {
            filter: StateVariableFilter::new(sample_rate),
            chorus: Vibrato::new(sample_rate, 5.5),
        };
        chain.configure(&SynthParams::default());
        chain
    }

    /// Cutoff for a normalized filter control: 200 Hz to ~18 kHz.
    pub fn cutoff_hz(filter: f32) -> f32 {
        200.0 * powf(2.0, filter.clamp(0.0, 1.0) * 6.5)
    }

    /// Apply synth settings.
    pub fn configure(&mut self, params: &SynthParams) {
        self.filter.set_cutoff(Self::cutoff_hz(params.filter));
        self.filter.set_q(0.707 + params.resonance * 7.0);
        self.chorus.set_depth(params.chorus);
        self.chorus.set_mix(params.chorus * 0.5);
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        self.chorus.process(self.filter.process(x))
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.chorus.reset();
    }
}

/// Bass amp: compression-style saturation and limiter.
#[derive(Debug, Clone)]
pub struct BassChain {
    squeeze: f32,
}

impl BassChain {
    fn new() -> Self {
        let mut chain = Self { squeeze: 1.0 };
        chain.configure(&BassParams::default());
        chain
    }

    /// Apply bass settings.
    pub fn configure(&mut self, params: &BassParams) {
        self.squeeze = 2.5 * (1.0 + params.compression);
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        tanhf(tanhf(x * self.squeeze) * 1.8)
    }
}

/// One chain per instrument kind.
#[derive(Debug, Clone)]
pub struct EffectsRack {
    organ: OrganChain,
    synth: SynthChain,
    guitar: GuitarChain,
    bass: BassChain,
}

impl EffectsRack {
    /// Build every chain configured with default settings.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            organ: OrganChain::new(sample_rate),
            synth: SynthChain::new(sample_rate),
            guitar: GuitarChain::new(sample_rate),
            bass: BassChain::new(),
        }
    }

    /// Reconfigure the chain belonging to `kind` from `settings`.
    pub fn configure(&mut self, kind: InstrumentKind, settings: &InstrumentSettings) {
        match kind {
            InstrumentKind::Organ => self.organ.configure(&settings.organ),
            InstrumentKind::Synth => self.synth.configure(&settings.synth),
            InstrumentKind::Guitar => self.guitar.configure(&settings.guitar),
            InstrumentKind::Bass => self.bass.configure(&settings.bass),
            InstrumentKind::Drums => {}
        }
    }

    /// Reconfigure every chain.
    pub fn configure_all(&mut self, settings: &InstrumentSettings) {
        for kind in InstrumentKind::ALL {
            self.configure(kind, settings);
        }
    }

    /// Update the wah pedal (guitar chain).
    pub fn set_wah(&mut self, state: WahState) {
        self.guitar.wah.set_state(state);
    }

    /// Process one sample of an instrument bus.
    #[inline]
    pub fn process(&mut self, kind: InstrumentKind, x: f32) -> f32 {
        match kind {
            InstrumentKind::Organ => self.organ.process(x),
            InstrumentKind::Synth => self.synth.process(x),
            InstrumentKind::Guitar => self.guitar.process(x),
            InstrumentKind::Bass => self.bass.process(x),
            InstrumentKind::Drums => tanhf(x * 3.75),
        }
    }

    /// Clear every tail (reverb, chorus and filter memory).
    pub fn reset(&mut self) {
        self.organ.reset();
        self.synth.reset();
        self.guitar.reset();
    }
}
