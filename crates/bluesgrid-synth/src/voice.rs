//! Voices and the fixed eight-slot voice manager.
//!
//! The caller picks the slot for every gesture (see [`VoiceAllocator`]) and
//! keeps addressing the same slot for bends and the final release. Slots
//! outside `0..MAX_VOICES` are ignored.

use libm::{log2f, powf};

use crate::envelope::{AdsrEnvelope, EnvelopeStage};
use crate::oscillator::{Instrument, Oscillator};
use crate::params::{InstrumentKind, InstrumentSettings};

/// Number of simultaneous voices.
pub const MAX_VOICES: usize = 8;

/// Per-voice output level before the instrument bus.
pub const VOICE_AMPLITUDE: f32 = 0.8;

const MIN_FREQ: f32 = 20.0;
const MAX_FREQ: f32 = 20_000.0;

/// Convert a MIDI note number to Hz (A4 = 69 = 440 Hz).
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Convert Hz to a fractional MIDI note number.
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * log2f(freq / 440.0)
}

/// Frequency ratio for a pitch offset in semitones.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

/// One synthesis voice.
#[derive(Debug, Clone)]
pub struct Voice {
    osc: Oscillator,
    envelope: AdsrEnvelope,
    instrument: Instrument,
    frequency: f32,
    target_frequency: f32,
    pitch_bend: f32,
    glide_coeff: f32,
    sample_rate: f32,
}

impl Voice {
    /// Create an idle voice. `seed` decorrelates drum noise between voices.
    pub fn new(sample_rate: f32, seed: u32) -> Self {
        Self {
            osc: Oscillator::new(sample_rate).with_seed(seed),
            envelope: AdsrEnvelope::new(sample_rate),
            instrument: Instrument::default(),
            frequency: 440.0,
            target_frequency: 440.0,
            pitch_bend: 0.0,
            glide_coeff: 1.0,
            sample_rate: sample_rate.max(1.0),
        }
    }

    /// Portamento time in seconds; zero jumps straight to the new pitch.
    pub fn set_glide(&mut self, seconds: f32) {
        self.glide_coeff = if seconds.is_finite() && seconds > 0.0 {
            1.0 - libm::expf(-1.0 / (seconds * self.sample_rate))
        } else {
            1.0
        };
    }

    /// Start a note. Frequencies are clamped to 20 Hz to 20 kHz; a
    /// non-positive or NaN frequency is ignored. Bend returns to zero.
    pub fn note_on(&mut self, frequency: f32, instrument: Instrument, settings: &InstrumentSettings) {
        if !(frequency > 0.0 && frequency.is_finite()) {
            return;
        }
        let frequency = frequency.clamp(MIN_FREQ, MAX_FREQ);
        let gliding = self.glide_coeff < 1.0 && self.is_active() && self.instrument == instrument;

        self.target_frequency = frequency;
        if !gliding {
            self.frequency = frequency;
        }
        self.pitch_bend = 0.0;
        self.instrument = instrument;

        let attack = match instrument {
            Instrument::Synth(_) => settings.synth.attack_seconds(),
            _ => 0.01,
        };
        self.envelope.set_attack(attack);

        self.osc.trigger();
        self.envelope.gate_on();
    }

    /// Release the note; the voice keeps sounding until the envelope ends.
    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    /// Release to silence within `samples` samples.
    pub fn fast_release(&mut self, samples: usize) {
        self.envelope.fast_release(samples);
    }

    /// Silence immediately.
    pub fn kill(&mut self) {
        self.envelope.reset();
        self.pitch_bend = 0.0;
    }

    /// Bend in semitones relative to the note. Any range is accepted; the
    /// bent frequency is what gets clamped. NaN resets.
    pub fn set_pitch_bend(&mut self, semitones: f32) {
        self.pitch_bend = if semitones.is_nan() { 0.0 } else { semitones };
    }

    /// Current bend in semitones.
    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    /// Base (unbent) frequency currently sounding.
    pub fn base_frequency(&self) -> f32 {
        self.frequency
    }

    /// Frequency the last note-on asked for.
    pub fn target_frequency(&self) -> f32 {
        self.target_frequency
    }

    /// `base · 2^(bend / 12)`, kept within 20 Hz to 20 kHz.
    pub fn effective_frequency(&self) -> f32 {
        (self.frequency * semitones_to_ratio(self.pitch_bend)).clamp(MIN_FREQ, MAX_FREQ)
    }

    /// Instrument bound at the last note-on.
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Envelope segment.
    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    /// True until the release tail reaches silence.
    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    /// Render one sample.
    #[inline]
    pub fn render(&mut self, settings: &InstrumentSettings) -> f32 {
        if !self.envelope.is_active() {
            return 0.0;
        }
        if self.frequency != self.target_frequency {
            self.frequency += (self.target_frequency - self.frequency) * self.glide_coeff;
            if (self.frequency - self.target_frequency).abs() < 1e-3 {
                self.frequency = self.target_frequency;
            }
        }

        let sample = self.osc.render(self.effective_frequency(), self.instrument, settings);
        let env = self.envelope.advance();
        let gain = if self.instrument.is_plucked() {
            (env * 1.5).min(1.0)
        } else {
            env
        };
        sample * gain * VOICE_AMPLITUDE
    }
}

/// Owns the eight voice slots and the instrument new notes play.
#[derive(Debug, Clone)]
pub struct VoiceManager {
    voices: [Voice; MAX_VOICES],
    instrument: Instrument,
}

impl VoiceManager {
    /// Eight idle voices playing the default instrument.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: core::array::from_fn(|i| Voice::new(sample_rate, 0x9E37_79B9 ^ ((i as u32 + 1) * 0x0101_0101))),
            instrument: Instrument::default(),
        }
    }

    /// Instrument for subsequent note-ons. Sounding notes keep theirs.
    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.instrument = instrument;
    }

    /// Instrument for subsequent note-ons.
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Portamento time for every voice.
    pub fn set_glide(&mut self, seconds: f32) {
        for voice in &mut self.voices {
            voice.set_glide(seconds);
        }
    }

    /// Start a note on `index`. Out-of-range indices are ignored.
    pub fn note_on(&mut self, index: usize, frequency: f32, settings: &InstrumentSettings) {
        let instrument = self.instrument;
        if let Some(voice) = self.voices.get_mut(index) {
            voice.note_on(frequency, instrument, settings);
        }
    }

    /// Release the note on `index`. Out-of-range indices are ignored.
    pub fn note_off(&mut self, index: usize) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.note_off();
        }
    }

    /// Bend the note on `index`. Out-of-range indices are ignored.
    pub fn set_pitch_bend(&mut self, index: usize, semitones: f32) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.set_pitch_bend(semitones);
        }
    }

    /// Release every sounding voice to silence within `fade_samples`.
    pub fn all_notes_off(&mut self, fade_samples: usize) {
        for voice in &mut self.voices {
            voice.fast_release(fade_samples);
        }
    }

    /// Silence every voice immediately.
    pub fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
    }

    /// Number of voices still sounding.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Borrow a voice.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Render one sample of every voice, summed per instrument bus.
    #[inline]
    pub fn render_buses(&mut self, settings: &InstrumentSettings, buses: &mut [f32; InstrumentKind::COUNT]) {
        *buses = [0.0; InstrumentKind::COUNT];
        for voice in &mut self.voices {
            if voice.is_active() {
                let kind = voice.instrument().kind();
                buses[kind.index()] += voice.render(settings);
            }
        }
    }
}

/// Caller-side round-robin slot cursor.
#[derive(Debug, Clone, Default)]
pub struct VoiceAllocator {
    next: usize,
}

impl VoiceAllocator {
    /// Take the next slot, wrapping after the last one.
    pub fn allocate(&mut self) -> usize {
        let slot = self.next;
        self.next = (self.next + 1) % MAX_VOICES;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::Waveform;

    const SR: f32 = 48000.0;

    fn settings() -> InstrumentSettings {
        InstrumentSettings::default()
    }

    #[test]
    fn pitch_helpers() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-3);
        assert!((midi_to_freq(57.0) - 220.0).abs() < 1e-3);
        assert!((freq_to_midi(880.0) - 81.0).abs() < 1e-4);
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let mut vm = VoiceManager::new(SR);
        vm.note_on(8, 220.0, &settings());
        vm.note_on(usize::MAX, 220.0, &settings());
        vm.note_off(99);
        vm.set_pitch_bend(42, 3.0);
        assert_eq!(vm.active_count(), 0);
        assert!(vm.voice(8).is_none());
    }

    #[test]
    fn invalid_frequency_does_not_start_a_note() {
        let mut vm = VoiceManager::new(SR);
        vm.note_on(0, f32::NAN, &settings());
        vm.note_on(1, -5.0, &settings());
        vm.note_on(2, 0.0, &settings());
        assert_eq!(vm.active_count(), 0);
    }

    #[test]
    fn frequency_is_clamped() {
        let mut vm = VoiceManager::new(SR);
        vm.note_on(0, 5.0, &settings());
        vm.note_on(1, 50_000.0, &settings());
        assert_eq!(vm.voice(0).map(Voice::base_frequency), Some(20.0));
        assert_eq!(vm.voice(1).map(Voice::base_frequency), Some(20_000.0));
    }

    #[test]
    fn wide_bend_passes_through_and_resets_on_note_on() {
        let mut voice = Voice::new(SR, 1);
        voice.note_on(220.0, Instrument::Organ, &settings());
        voice.set_pitch_bend(24.0);
        assert_eq!(voice.pitch_bend(), 24.0);
        assert!((voice.effective_frequency() - 880.0).abs() < 1e-2);
        voice.set_pitch_bend(-24.0);
        assert!((voice.effective_frequency() - 55.0).abs() < 1e-3);
        voice.note_on(220.0, Instrument::Organ, &settings());
        assert_eq!(voice.pitch_bend(), 0.0);
    }

    #[test]
    fn bent_frequency_stays_audible() {
        let mut voice = Voice::new(SR, 1);
        voice.note_on(5_000.0, Instrument::Organ, &settings());
        voice.set_pitch_bend(36.0);
        assert_eq!(voice.effective_frequency(), 20_000.0);
        voice.set_pitch_bend(-96.0);
        assert_eq!(voice.effective_frequency(), 20.0);
        voice.set_pitch_bend(f32::INFINITY);
        assert_eq!(voice.effective_frequency(), 20_000.0);
        voice.set_pitch_bend(f32::NAN);
        assert_eq!(voice.effective_frequency(), 5_000.0);
    }

    #[test]
    fn sounding_notes_keep_their_instrument() {
        let mut vm = VoiceManager::new(SR);
        vm.set_instrument(Instrument::Bass);
        vm.note_on(0, 110.0, &settings());
        vm.set_instrument(Instrument::Organ);
        vm.note_on(1, 220.0, &settings());
        assert_eq!(vm.voice(0).map(Voice::instrument), Some(Instrument::Bass));
        assert_eq!(vm.voice(1).map(Voice::instrument), Some(Instrument::Organ));
    }

    #[test]
    fn glide_approaches_target() {
        let mut voice = Voice::new(SR, 1);
        voice.set_glide(0.05);
        let s = settings();
        voice.note_on(220.0, Instrument::Synth(Waveform::Sine), &s);
        voice.render(&s);
        voice.note_on(440.0, Instrument::Synth(Waveform::Sine), &s);
        assert_eq!(voice.base_frequency(), 220.0);
        assert_eq!(voice.target_frequency(), 440.0);
        for _ in 0..(SR as usize) {
            voice.render(&s);
        }
        assert_eq!(voice.base_frequency(), 440.0);
    }

    #[test]
    fn buses_route_by_instrument() {
        let mut vm = VoiceManager::new(SR);
        let s = settings();
        vm.set_instrument(Instrument::Organ);
        vm.note_on(0, 220.0, &s);
        let mut buses = [0.0; InstrumentKind::COUNT];
        let mut organ_energy = 0.0;
        for _ in 0..480 {
            vm.render_buses(&s, &mut buses);
            organ_energy += buses[InstrumentKind::Organ.index()].abs();
            assert_eq!(buses[InstrumentKind::Guitar.index()], 0.0);
        }
        assert!(organ_energy > 0.0);
    }

    #[test]
    fn allocator_wraps() {
        let mut alloc = VoiceAllocator::default();
        let slots: Vec<usize> = (0..10).map(|_| alloc.allocate()).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
    }
}
