//! The render callback: command drain, voice mix, effects, master bus.
//!
//! [`SynthEngine::render`] is what the audio backend calls. Per frame it
//! applies up to [`MAX_DRAIN_PER_FRAME`] pending commands, renders every
//! voice into its instrument bus, runs each bus through its effects chain,
//! sums, applies master volume and the fixed attenuation, hard-limits, and
//! writes the sample to every channel of the frame.
//!
//! Nothing here allocates, locks or logs.

use bluesgrid_core::hard_clip;

use crate::command::{Command, CommandReceiver};
use crate::effects::EffectsRack;
use crate::oscillator::Instrument;
use crate::params::{InstrumentKind, InstrumentSettings, WahState};
use crate::voice::VoiceManager;

/// Fixed headroom applied after master volume.
pub const MASTER_ATTENUATION: f32 = 0.25;

/// Master volume at start-up.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.8;

/// Upper bound on commands applied before each frame.
pub const MAX_DRAIN_PER_FRAME: usize = 64;

/// Longest fade used by `AllNotesOff`.
const PANIC_FADE_SECONDS: f32 = 0.002;

/// Real-time synthesis engine. Owned by the audio thread.
#[derive(Debug)]
pub struct SynthEngine {
    sample_rate: f32,
    voices: VoiceManager,
    settings: InstrumentSettings,
    wah: WahState,
    rack: EffectsRack,
    master_volume: f32,
    commands: CommandReceiver,
    buses: [f32; InstrumentKind::COUNT],
    flush_tails: bool,
}

impl SynthEngine {
    /// Create an engine fed by `commands`.
    pub fn new(sample_rate: f32, commands: CommandReceiver) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            sample_rate,
            voices: VoiceManager::new(sample_rate),
            settings: InstrumentSettings::default(),
            wah: WahState::default(),
            rack: EffectsRack::new(sample_rate),
            master_volume: DEFAULT_MASTER_VOLUME,
            commands,
            buses: [0.0; InstrumentKind::COUNT],
            flush_tails: false,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current master volume.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Current instrument settings.
    pub fn settings(&self) -> &InstrumentSettings {
        &self.settings
    }

    /// Current wah state.
    pub fn wah(&self) -> WahState {
        self.wah
    }

    /// The voice slots.
    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    /// Fill `out` with interleaved frames of `channels` channels.
    ///
    /// A trailing partial frame, if any, is zeroed.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;

        for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
            let frames_left = frames - i;
            for _ in 0..MAX_DRAIN_PER_FRAME {
                match self.commands.try_recv() {
                    Some(command) => self.apply_within(command, frames_left),
                    None => break,
                }
            }
            frame.fill(self.next_sample());
        }
        out[frames * channels..].fill(0.0);

        if self.flush_tails && self.voices.active_count() == 0 {
            self.rack.reset();
            self.flush_tails = false;
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        self.voices.render_buses(&self.settings, &mut self.buses);
        let mut mix = 0.0;
        for kind in InstrumentKind::ALL {
            mix += self.rack.process(kind, self.buses[kind.index()]);
        }
        hard_clip(mix * self.master_volume * MASTER_ATTENUATION, 1.0)
    }

    /// Apply a command immediately, outside the render loop.
    pub fn apply(&mut self, command: Command) {
        self.apply_within(command, usize::MAX);
    }

    fn apply_within(&mut self, command: Command, frames_left: usize) {
        match command {
            Command::NoteOn { voice, frequency } => {
                self.voices.note_on(voice, frequency, &self.settings);
                self.flush_tails = false;
            }
            Command::NoteOff { voice } => self.voices.note_off(voice),
            Command::SetPitchBend { voice, semitones } => {
                self.voices.set_pitch_bend(voice, semitones);
            }
            Command::SetParams(params) => {
                self.settings.apply(params);
                self.rack.configure(params.kind(), &self.settings);
            }
            Command::SetMasterVolume(volume) => {
                if !volume.is_nan() {
                    self.master_volume = volume.clamp(0.0, 1.0);
                }
            }
            Command::SetWaveType(code) => {
                self.voices.set_instrument(Instrument::from_wave_type(code));
            }
            Command::SetGlide(seconds) => self.voices.set_glide(seconds),
            Command::SetWahEnabled(enabled) => {
                self.wah.set_enabled(enabled);
                self.rack.set_wah(self.wah);
            }
            Command::SetWahPosition(position) => {
                self.wah.set_position(position);
                self.rack.set_wah(self.wah);
            }
            Command::AllNotesOff => {
                let fade = (PANIC_FADE_SECONDS * self.sample_rate) as usize;
                self.voices.all_notes_off(fade.min(frames_left).max(1));
                self.flush_tails = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_queue;
    use crate::envelope::EnvelopeStage;
    use crate::params::{GuitarParams, InstrumentParams};

    const SR: f32 = 48000.0;

    fn engine() -> (crate::command::CommandSender, SynthEngine) {
        let (tx, rx) = command_queue(64);
        (tx, SynthEngine::new(SR, rx))
    }

    #[test]
    fn silent_without_notes() {
        let (_tx, mut eng) = engine();
        let mut buf = [1.0f32; 512];
        eng.render(&mut buf, 2);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mono_value_is_copied_to_every_channel() {
        let (tx, mut eng) = engine();
        tx.send(Command::NoteOn { voice: 0, frequency: 220.0 });
        let mut buf = [0.0f32; 512];
        eng.render(&mut buf, 2);
        for frame in buf.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(buf.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn partial_frame_is_zeroed() {
        let (tx, mut eng) = engine();
        tx.send(Command::NoteOn { voice: 0, frequency: 220.0 });
        let mut buf = [0.5f32; 7];
        eng.render(&mut buf, 2);
        assert_eq!(buf[6], 0.0);
    }

    #[test]
    fn master_volume_is_clamped() {
        let (tx, mut eng) = engine();
        tx.send(Command::SetMasterVolume(3.0));
        let mut buf = [0.0f32; 4];
        eng.render(&mut buf, 1);
        assert_eq!(eng.master_volume(), 1.0);
        eng.apply(Command::SetMasterVolume(-1.0));
        assert_eq!(eng.master_volume(), 0.0);
        eng.apply(Command::SetMasterVolume(f32::NAN));
        assert_eq!(eng.master_volume(), 0.0);
    }

    #[test]
    fn output_is_limited() {
        let (tx, mut eng) = engine();
        tx.send(Command::SetMasterVolume(1.0));
        tx.send(Command::SetWaveType(4));
        for v in 0..8 {
            tx.send(Command::NoteOn { voice: v, frequency: 82.0 * (v + 1) as f32 });
        }
        let mut buf = [0.0f32; 4096];
        eng.render(&mut buf, 1);
        assert!(buf.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn params_reach_settings() {
        let (tx, mut eng) = engine();
        let p = GuitarParams {
            sustain: 0.1,
            gain: 0.2,
            distortion: 0.3,
            reverb: 0.0,
        };
        tx.send(Command::SetParams(InstrumentParams::Guitar(p)));
        tx.send(Command::SetWahEnabled(true));
        tx.send(Command::SetWahPosition(0.25));
        let mut buf = [0.0f32; 8];
        eng.render(&mut buf, 1);
        assert_eq!(eng.settings().guitar, p);
        assert!(eng.wah().enabled);
        assert_eq!(eng.wah().position, 0.25);
    }

    #[test]
    fn all_notes_off_fades_within_block() {
        let (tx, mut eng) = engine();
        tx.send(Command::NoteOn { voice: 1, frequency: 330.0 });
        let mut buf = [0.0f32; 256];
        eng.render(&mut buf, 1);
        tx.send(Command::AllNotesOff);
        eng.render(&mut buf, 1);
        assert_eq!(eng.voices().active_count(), 0);
        assert_eq!(eng.voices().voice(1).map(|v| v.stage()), Some(EnvelopeStage::Idle));
    }
}
