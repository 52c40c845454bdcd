//! The engine control surface.
//!
//! [`AudioEngine`] owns the output stream and the producer half of the synth
//! command queue. Every control call becomes a [`Command`]; the
//! [`SynthEngine`] itself lives inside the output callback and is never
//! touched from the control thread.
//!
//! ```text
//! Uninitialized ──create──▶ Created ──start──▶ Running ◀──start── Stopped
//!                              ▲                  │  └────stop───────▲
//!                              └── device lost ───┘
//! any state ──destroy──▶ Destroyed ──create──▶ Created
//! ```
//!
//! A stream error flags the device as lost. The next control call observes
//! the flag, drops the stream and returns the engine to `Created`; the
//! caller must `start()` again.
//!
//! Global settings (volume, wave type, glide, instrument params, wah) are
//! mirrored on the control side and replayed into every new synth, so they
//! survive stop/start and device loss.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bluesgrid_synth::{
    Command, CommandSender, DEFAULT_MASTER_VOLUME, DEFAULT_QUEUE_CAPACITY, InstrumentParams,
    InstrumentSettings, SynthEngine, command_queue,
};

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::{Error, Result};

/// Lifecycle of an [`AudioEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing allocated.
    Uninitialized,
    /// Synth built and sample rate negotiated; no stream.
    Created,
    /// Stream open and rendering.
    Running,
    /// Stream closed by `stop()`.
    Stopped,
    /// Torn down.
    Destroyed,
}

/// Settings replayed into each freshly built synth.
#[derive(Debug, Clone, Copy)]
struct ControlMirror {
    master_volume: f32,
    wave_type: i32,
    glide_secs: f32,
    settings: InstrumentSettings,
    wah_enabled: bool,
    wah_position: Option<f32>,
}

impl Default for ControlMirror {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            wave_type: 1,
            glide_secs: 0.0,
            settings: InstrumentSettings::default(),
            wah_enabled: false,
            wah_position: None,
        }
    }
}

impl ControlMirror {
    fn replay(&self, synth: &mut SynthEngine) {
        synth.apply(Command::SetMasterVolume(self.master_volume));
        synth.apply(Command::SetWaveType(self.wave_type));
        synth.apply(Command::SetGlide(self.glide_secs));
        let s = self.settings;
        for params in [
            InstrumentParams::Guitar(s.guitar),
            InstrumentParams::Organ(s.organ),
            InstrumentParams::Synth(s.synth),
            InstrumentParams::Bass(s.bass),
            InstrumentParams::Drums(s.drums),
        ] {
            synth.apply(Command::SetParams(params));
        }
        synth.apply(Command::SetWahEnabled(self.wah_enabled));
        if let Some(position) = self.wah_position {
            synth.apply(Command::SetWahPosition(position));
        }
    }
}

/// Owns an output stream running a [`SynthEngine`] and forwards control
/// calls to it through the command queue.
pub struct AudioEngine<B: AudioBackend> {
    backend: B,
    config: BackendStreamConfig,
    queue_capacity: usize,
    state: EngineState,
    requested_rate: u32,
    sample_rate: u32,
    sender: Option<CommandSender>,
    pending: Option<SynthEngine>,
    stream: Option<StreamHandle>,
    device_lost: Arc<AtomicBool>,
    mirror: ControlMirror,
}

impl<B: AudioBackend> AudioEngine<B> {
    /// An uninitialized engine for `backend`.
    pub fn new(backend: B, config: BackendStreamConfig) -> Self {
        Self {
            requested_rate: config.sample_rate,
            sample_rate: config.sample_rate,
            backend,
            config,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            state: EngineState::Uninitialized,
            sender: None,
            pending: None,
            stream: None,
            device_lost: Arc::new(AtomicBool::new(false)),
            mirror: ControlMirror::default(),
        }
    }

    /// Use a command queue of `capacity` entries for synths built from now on.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Negotiated sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The stream configuration.
    pub fn config(&self) -> &BackendStreamConfig {
        &self.config
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Commands dropped because the queue was full.
    pub fn dropped_commands(&self) -> u64 {
        self.sender.as_ref().map_or(0, CommandSender::dropped)
    }

    /// Create the synth. Returns `false` (and logs) on failure.
    pub fn create(&mut self) -> bool {
        match self.try_create() {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "engine create failed");
                false
            }
        }
    }

    /// Create the synth at the sample rate the backend will deliver.
    ///
    /// A no-op in `Created`, `Running` and `Stopped`.
    pub fn try_create(&mut self) -> Result<()> {
        match self.state {
            EngineState::Uninitialized | EngineState::Destroyed => {}
            EngineState::Created | EngineState::Running | EngineState::Stopped => return Ok(()),
        }
        self.negotiate_rate()?;
        self.device_lost.store(false, Ordering::Release);
        self.pending = Some(self.build_synth());
        self.state = EngineState::Created;
        tracing::info!(
            backend = self.backend.name(),
            sample_rate = self.sample_rate,
            channels = self.config.channels,
            "engine created"
        );
        Ok(())
    }

    /// Start output. Returns `false` (and logs) on failure.
    pub fn start(&mut self) -> bool {
        match self.try_start() {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "engine start failed");
                false
            }
        }
    }

    /// Start output, creating the engine first if needed.
    pub fn try_start(&mut self) -> Result<()> {
        self.poll_device();
        match self.state {
            EngineState::Running => return Ok(()),
            EngineState::Uninitialized => self.try_create()?,
            EngineState::Destroyed => return Err(Error::InvalidState("engine destroyed")),
            EngineState::Created | EngineState::Stopped => {}
        }

        let mut synth = match self.pending.take() {
            Some(synth) => synth,
            None => {
                // The device may have changed since the synth was built.
                self.negotiate_rate()?;
                self.build_synth()
            }
        };
        let channels = usize::from(self.config.channels.max(1));
        let lost = Arc::clone(&self.device_lost);
        lost.store(false, Ordering::Release);

        let stream = self.backend.build_output_stream(
            &self.config,
            Box::new(move |data: &mut [f32]| synth.render(data, channels)),
            Box::new(move |msg: &str| {
                lost.store(true, Ordering::Release);
                tracing::error!(error = msg, "audio stream error");
            }),
        )?;
        self.stream = Some(stream);
        self.state = EngineState::Running;
        tracing::info!(sample_rate = self.sample_rate, "engine started");
        Ok(())
    }

    /// Stop output. The voices are lost; settings are kept.
    pub fn stop(&mut self) {
        self.poll_device();
        if self.state != EngineState::Running {
            return;
        }
        self.stream = None;
        self.state = EngineState::Stopped;
        tracing::info!("engine stopped");
    }

    /// Silence everything and release the stream.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        if self.state == EngineState::Running
            && let Some(sender) = &self.sender
        {
            sender.send(Command::AllNotesOff);
        }
        self.stream = None;
        self.pending = None;
        self.sender = None;
        self.state = EngineState::Destroyed;
        tracing::info!("engine destroyed");
    }

    /// Start a note on `voice` (0..8).
    pub fn note_on(&mut self, voice: usize, frequency: f32) {
        tracing::debug!(voice, freq = frequency, "note on");
        self.send(Command::NoteOn { voice, frequency });
    }

    /// Release `voice`.
    pub fn note_off(&mut self, voice: usize) {
        tracing::debug!(voice, "note off");
        self.send(Command::NoteOff { voice });
    }

    /// Release every voice within one callback period.
    pub fn all_notes_off(&mut self) {
        tracing::debug!("all notes off");
        self.send(Command::AllNotesOff);
    }

    /// Bend `voice` by `semitones` from its base pitch.
    pub fn set_pitch_bend(&mut self, voice: usize, semitones: f32) {
        tracing::trace!(voice, semitones, "pitch bend");
        self.send(Command::SetPitchBend { voice, semitones });
    }

    /// Master volume in [0, 1].
    pub fn set_master_volume(&mut self, volume: f32) {
        if !volume.is_nan() {
            self.mirror.master_volume = volume.clamp(0.0, 1.0);
        }
        tracing::debug!(volume, "master volume");
        self.send(Command::SetMasterVolume(volume));
    }

    /// Select the instrument for new notes by wave-type code.
    pub fn set_wave_type(&mut self, code: i32) {
        self.mirror.wave_type = code;
        tracing::info!(code, "wave type");
        self.send(Command::SetWaveType(code));
    }

    /// Replace one instrument's effect settings.
    pub fn set_instrument_params(&mut self, params: InstrumentParams) {
        self.mirror.settings.apply(params);
        tracing::debug!(?params, "instrument params");
        self.send(Command::SetParams(params));
    }

    /// Engage or bypass the wah.
    pub fn set_wah_enabled(&mut self, enabled: bool) {
        self.mirror.wah_enabled = enabled;
        self.mirror.wah_position = None;
        tracing::debug!(enabled, "wah");
        self.send(Command::SetWahEnabled(enabled));
    }

    /// Wah pedal position in [0, 1]; switches the pedal to manual.
    pub fn set_wah_position(&mut self, position: f32) {
        self.mirror.wah_position = Some(position);
        tracing::trace!(position, "wah position");
        self.send(Command::SetWahPosition(position));
    }

    /// Portamento time in seconds (0 = off).
    pub fn set_glide(&mut self, seconds: f32) {
        self.mirror.glide_secs = seconds;
        tracing::debug!(seconds, "glide");
        self.send(Command::SetGlide(seconds));
    }

    /// Route a synth command through the matching control call.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::NoteOn { voice, frequency } => self.note_on(voice, frequency),
            Command::NoteOff { voice } => self.note_off(voice),
            Command::SetPitchBend { voice, semitones } => self.set_pitch_bend(voice, semitones),
            Command::SetParams(params) => self.set_instrument_params(params),
            Command::SetMasterVolume(volume) => self.set_master_volume(volume),
            Command::SetWaveType(code) => self.set_wave_type(code),
            Command::SetGlide(seconds) => self.set_glide(seconds),
            Command::SetWahEnabled(enabled) => self.set_wah_enabled(enabled),
            Command::SetWahPosition(position) => self.set_wah_position(position),
            Command::AllNotesOff => self.all_notes_off(),
        }
    }

    /// True while the stream is up; notices a lost device.
    pub fn is_running(&mut self) -> bool {
        self.poll_device();
        self.state == EngineState::Running
    }

    fn negotiate_rate(&mut self) -> Result<()> {
        let requested = BackendStreamConfig {
            sample_rate: self.requested_rate,
            ..self.config.clone()
        };
        self.sample_rate = self.backend.actual_sample_rate(&requested)?;
        self.config.sample_rate = self.sample_rate;
        Ok(())
    }

    fn build_synth(&mut self) -> SynthEngine {
        let (sender, receiver) = command_queue(self.queue_capacity);
        let mut synth = SynthEngine::new(self.sample_rate as f32, receiver);
        self.mirror.replay(&mut synth);
        self.sender = Some(sender);
        synth
    }

    /// React to a lost device before handling a control call.
    fn poll_device(&mut self) {
        if self.state == EngineState::Running && self.device_lost.swap(false, Ordering::AcqRel) {
            self.stream = None;
            self.sender = None;
            self.state = EngineState::Created;
            tracing::warn!("audio device lost, engine needs a restart");
        }
    }

    fn send(&mut self, command: Command) {
        self.poll_device();
        // Notes only make sense on a live or about-to-start synth.
        let live = matches!(self.state, EngineState::Running)
            || (self.state == EngineState::Created && self.pending.is_some());
        if !live {
            tracing::debug!(state = ?self.state, "control call ignored");
            return;
        }
        if let Some(sender) = &self.sender
            && !sender.send(command)
        {
            tracing::warn!(dropped = sender.dropped(), "command queue full");
        }
    }
}

impl<B: AudioBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: AudioBackend> std::fmt::Debug for AudioEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}
