//! Linear ADSR amplitude envelope.
//!
//! Segments are straight ramps, so a release started from any level reaches
//! exactly zero after the configured release time. Retriggering does not
//! reset the level, which keeps repeated taps on one grid cell click-free.

/// Envelope segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Silent, voice is free.
    #[default]
    Idle,
    /// Rising toward full level.
    Attack,
    /// Falling toward the sustain level.
    Decay,
    /// Holding while the gate is on.
    Sustain,
    /// Falling to zero after the gate closed.
    Release,
}

const MIN_TIME_SECONDS: f32 = 0.001;

/// Linear attack-decay-sustain-release generator.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    stage: EnvelopeStage,
    level: f32,
    sample_rate: f32,

    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,

    attack_rate: f32,
    decay_rate: f32,
    release_rate: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// 10 ms attack, 50 ms decay, 0.7 sustain, 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate: sample_rate.max(1.0),
            attack: 0.01,
            decay: 0.05,
            sustain: 0.7,
            release: 0.1,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
        };
        env.recalculate_rates();
        env
    }

    /// Attack time in seconds (minimum 1 ms).
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = seconds.max(MIN_TIME_SECONDS);
        self.recalculate_rates();
    }

    /// Decay time in seconds (minimum 1 ms).
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.max(MIN_TIME_SECONDS);
        self.recalculate_rates();
    }

    /// Sustain level in [0, 1].
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
        self.recalculate_rates();
    }

    /// Release time in seconds (minimum 1 ms).
    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(MIN_TIME_SECONDS);
        self.recalculate_rates();
    }

    /// Release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate_rates();
    }

    fn recalculate_rates(&mut self) {
        self.attack_rate = 1.0 / (self.attack * self.sample_rate);
        self.decay_rate = (1.0 - self.sustain) / (self.decay * self.sample_rate);
        self.release_rate = self.sustain.max(0.001) / (self.release * self.sample_rate);
    }

    /// Open the gate. The current level is kept.
    pub fn gate_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Close the gate; the slope is set so the current level reaches zero
    /// in exactly the release time.
    pub fn gate_off(&mut self) {
        if self.stage != EnvelopeStage::Idle {
            self.stage = EnvelopeStage::Release;
            if self.level > 0.001 {
                self.release_rate = self.level / (self.release * self.sample_rate);
            }
        }
    }

    /// Release to zero within `samples` samples (at least one).
    pub fn fast_release(&mut self, samples: usize) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.stage = EnvelopeStage::Release;
        // 0.1% margin absorbs accumulated rounding in the linear ramp.
        self.release_rate = self.level.max(1e-6) / samples.max(1) as f32 * 1.001;
    }

    /// Force silence immediately.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }

    /// Current segment.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// True until the release reaches zero.
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Advance one sample and return the level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => return 0.0,
            EnvelopeStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.sustain;
            }
            EnvelopeStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }
}
