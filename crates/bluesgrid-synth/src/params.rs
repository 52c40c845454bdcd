//! Per-instrument effect settings and the global wah pedal state.
//!
//! Every field is a normalized control in `[0, 1]`. Constructors and
//! [`InstrumentSettings::apply`] clamp out-of-range input (NaN becomes 0)
//! instead of rejecting it.

/// Clamp a control value to `[0, 1]`, mapping NaN to zero.
#[inline]
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Instrument families that own an effects chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Tonewheel organ.
    Organ,
    /// Subtractive lead synth.
    Synth,
    /// Overdriven electric guitar.
    Guitar,
    /// Electric bass.
    Bass,
    /// Drum kit.
    Drums,
}

impl InstrumentKind {
    /// All kinds, in bus order.
    pub const ALL: [Self; 5] = [Self::Organ, Self::Synth, Self::Guitar, Self::Bass, Self::Drums];

    /// Number of instrument kinds.
    pub const COUNT: usize = 5;

    /// Bus index in `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Organ => 0,
            Self::Synth => 1,
            Self::Guitar => 2,
            Self::Bass => 3,
            Self::Drums => 4,
        }
    }
}

/// Guitar amp and pedalboard settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuitarParams {
    /// String feedback and decay floor.
    pub sustain: f32,
    /// Preamp gain and brightness.
    pub gain: f32,
    /// Distortion drive.
    pub distortion: f32,
    /// Reverb send.
    pub reverb: f32,
}

impl Default for GuitarParams {
    fn default() -> Self {
        Self {
            sustain: 0.9,
            gain: 0.85,
            distortion: 0.8,
            reverb: 0.6,
        }
    }
}

impl GuitarParams {
    /// Clamp every field into range.
    pub fn clamped(self) -> Self {
        Self {
            sustain: unit(self.sustain),
            gain: unit(self.gain),
            distortion: unit(self.distortion),
            reverb: unit(self.reverb),
        }
    }
}

/// Organ settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrganParams {
    /// Level of the upper drawbars.
    pub drawbar: f32,
    /// Rotary speaker depth.
    pub leslie: f32,
    /// Chorus depth.
    pub chorus: f32,
    /// Preamp overdrive.
    pub overdrive: f32,
}

impl Default for OrganParams {
    fn default() -> Self {
        Self {
            drawbar: 0.8,
            leslie: 0.5,
            chorus: 0.4,
            overdrive: 0.3,
        }
    }
}

impl OrganParams {
    /// Clamp every field into range.
    pub fn clamped(self) -> Self {
        Self {
            drawbar: unit(self.drawbar),
            leslie: unit(self.leslie),
            chorus: unit(self.chorus),
            overdrive: unit(self.overdrive),
        }
    }
}

/// Lead synth settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthParams {
    /// Envelope attack time.
    pub attack: f32,
    /// Lowpass cutoff.
    pub filter: f32,
    /// Lowpass resonance.
    pub resonance: f32,
    /// Chorus depth.
    pub chorus: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            attack: 0.1,
            filter: 0.7,
            resonance: 0.4,
            chorus: 0.3,
        }
    }
}

impl SynthParams {
    /// Clamp every field into range.
    pub fn clamped(self) -> Self {
        Self {
            attack: unit(self.attack),
            filter: unit(self.filter),
            resonance: unit(self.resonance),
            chorus: unit(self.chorus),
        }
    }

    /// Attack time in seconds: 1 ms at 0, 10 ms at the default, ~0.9 s at 1.
    pub fn attack_seconds(&self) -> f32 {
        0.001 + self.attack * self.attack * 0.9
    }
}

/// Bass settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BassParams {
    /// Tone (lowpass brightness).
    pub tone: f32,
    /// Pluck emphasis.
    pub attack: f32,
    /// Sustain floor of the pluck energy.
    pub sustain: f32,
    /// Amp compression.
    pub compression: f32,
}

impl Default for BassParams {
    fn default() -> Self {
        Self {
            tone: 0.6,
            attack: 0.1,
            sustain: 0.7,
            compression: 0.5,
        }
    }
}

impl BassParams {
    /// Clamp every field into range.
    pub fn clamped(self) -> Self {
        Self {
            tone: unit(self.tone),
            attack: unit(self.attack),
            sustain: unit(self.sustain),
            compression: unit(self.compression),
        }
    }
}

/// Drum kit mix levels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrumParams {
    /// Kick level.
    pub kick: f32,
    /// Snare level.
    pub snare: f32,
    /// Hi-hat and cymbal level.
    pub hihat: f32,
    /// Tom level.
    pub tom: f32,
}

impl Default for DrumParams {
    fn default() -> Self {
        Self {
            kick: 0.8,
            snare: 0.7,
            hihat: 0.6,
            tom: 0.7,
        }
    }
}

impl DrumParams {
    /// Clamp every field into range.
    pub fn clamped(self) -> Self {
        Self {
            kick: unit(self.kick),
            snare: unit(self.snare),
            hihat: unit(self.hihat),
            tom: unit(self.tom),
        }
    }
}

/// A settings update for one instrument, as carried by the command queue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InstrumentParams {
    /// Guitar settings.
    Guitar(GuitarParams),
    /// Organ settings.
    Organ(OrganParams),
    /// Synth settings.
    Synth(SynthParams),
    /// Bass settings.
    Bass(BassParams),
    /// Drum settings.
    Drums(DrumParams),
}

impl InstrumentParams {
    /// The instrument this update targets.
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::Guitar(_) => InstrumentKind::Guitar,
            Self::Organ(_) => InstrumentKind::Organ,
            Self::Synth(_) => InstrumentKind::Synth,
            Self::Bass(_) => InstrumentKind::Bass,
            Self::Drums(_) => InstrumentKind::Drums,
        }
    }
}

/// The current settings of every instrument. Last write wins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InstrumentSettings {
    /// Guitar settings.
    pub guitar: GuitarParams,
    /// Organ settings.
    pub organ: OrganParams,
    /// Synth settings.
    pub synth: SynthParams,
    /// Bass settings.
    pub bass: BassParams,
    /// Drum settings.
    pub drums: DrumParams,
}

impl InstrumentSettings {
    /// Replace one instrument's settings, clamping the incoming values.
    pub fn apply(&mut self, params: InstrumentParams) {
        match params {
            InstrumentParams::Guitar(p) => self.guitar = p.clamped(),
            InstrumentParams::Organ(p) => self.organ = p.clamped(),
            InstrumentParams::Synth(p) => self.synth = p.clamped(),
            InstrumentParams::Bass(p) => self.bass = p.clamped(),
            InstrumentParams::Drums(p) => self.drums = p.clamped(),
        }
    }
}

/// How the wah pedal position is driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WahMode {
    /// An internal LFO rocks the pedal.
    #[default]
    Auto,
    /// The position comes from the caller.
    Manual,
}

/// Global wah pedal state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WahState {
    /// Pedal engaged.
    pub enabled: bool,
    /// Pedal position: 0 = heel (dark), 1 = toe (bright).
    pub position: f32,
    /// Sweep source.
    pub mode: WahMode,
}

impl Default for WahState {
    fn default() -> Self {
        Self {
            enabled: false,
            position: 0.5,
            mode: WahMode::Auto,
        }
    }
}

impl WahState {
    /// Engage or bypass the pedal. Engaging starts in auto-sweep mode.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.mode = WahMode::Auto;
    }

    /// Set the pedal position and switch to manual control.
    pub fn set_position(&mut self, position: f32) {
        self.position = unit(position);
        self.mode = WahMode::Manual;
    }
}
