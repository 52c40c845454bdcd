//! bluesgrid synth - real-time polyphonic engine for the blues grid
//!
//! Eight voice slots, five instrument models (organ, lead synth, guitar,
//! bass, drums), one effects chain per instrument, and a non-blocking
//! command queue between the control surface and the audio callback.
//!
//! # Architecture
//!
//! ```text
//! control thread                 audio thread
//! ──────────────                 ─────────────────────────────────────────
//! CommandSender ──(bounded)──▶ CommandReceiver ─▶ SynthEngine::render
//!                                                  ├─ VoiceManager (8 × Voice)
//!                                                  │    └─ Oscillator + AdsrEnvelope
//!                                                  ├─ EffectsRack (chain per instrument)
//!                                                  └─ master volume · 0.25, hard limit
//! ```
//!
//! # Example
//!
//! ```rust
//! use bluesgrid_synth::{Command, SynthEngine, command_queue};
//!
//! let (tx, rx) = command_queue(64);
//! let mut engine = SynthEngine::new(48000.0, rx);
//!
//! tx.send(Command::SetWaveType(0));
//! tx.send(Command::NoteOn { voice: 0, frequency: 220.0 });
//!
//! let mut block = [0.0f32; 256];
//! engine.render(&mut block, 1);
//! assert!(block.iter().any(|s| *s != 0.0));
//! ```

pub mod command;
pub mod drums;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod oscillator;
pub mod params;
pub mod voice;

pub use command::{Command, CommandReceiver, CommandSender, DEFAULT_QUEUE_CAPACITY, command_queue};
pub use drums::{DrumKind, DrumPad};
pub use effects::{Distortion, EffectsRack, Leslie, Reverb, Vibrato, Wah};
pub use engine::{DEFAULT_MASTER_VOLUME, MASTER_ATTENUATION, MAX_DRAIN_PER_FRAME, SynthEngine};
pub use envelope::{AdsrEnvelope, EnvelopeStage};
pub use oscillator::{Instrument, Oscillator, Waveform};
pub use params::{
    BassParams, DrumParams, GuitarParams, InstrumentKind, InstrumentParams, InstrumentSettings,
    OrganParams, SynthParams, WahMode, WahState,
};
pub use voice::{
    MAX_VOICES, Voice, VoiceAllocator, VoiceManager, freq_to_midi, midi_to_freq,
    semitones_to_ratio,
};
