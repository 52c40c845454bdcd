//! Integration tests for bluesgrid-io: the engine lifecycle on a mock
//! backend, offline rendering to WAV, and decoding a WAV for key detection.

use std::sync::{Arc, Mutex};

use bluesgrid_io::{
    AudioBackend, AudioDevice, AudioEngine, BackendStreamConfig, EngineState, Error,
    ErrorCallback, FileSource, OfflineRenderer, OutputCallback, ScheduledCommand, StreamHandle,
    WavSpec, media_info, read_wav_mono, write_wav,
};
use bluesgrid_keydetect::{DetectionOutcome, KeyDetector, Note, ScaleType};
use bluesgrid_synth::{Command, GuitarParams, InstrumentParams};
use tempfile::NamedTempFile;

const SR: u32 = 48000;

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Slots {
    output: Option<OutputCallback>,
    error: Option<ErrorCallback>,
    streams_built: usize,
}

/// Backend whose "device" is driven by the test.
#[derive(Clone, Default)]
struct MockBackend {
    slots: Arc<Mutex<Slots>>,
    rate: Option<u32>,
    fail_builds: bool,
}

/// Clears the mock's callbacks when the engine drops the stream.
struct MockStream(Arc<Mutex<Slots>>);

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut slots = self.0.lock().unwrap();
        slots.output = None;
        slots.error = None;
    }
}

impl MockBackend {
    fn with_rate(rate: u32) -> Self {
        Self {
            rate: Some(rate),
            ..Self::default()
        }
    }

    fn is_streaming(&self) -> bool {
        self.slots.lock().unwrap().output.is_some()
    }

    fn streams_built(&self) -> usize {
        self.slots.lock().unwrap().streams_built
    }

    /// Pull `frames` stereo frames from the engine, or `None` if no stream.
    fn pull(&self, frames: usize) -> Option<Vec<f32>> {
        let mut slots = self.slots.lock().unwrap();
        let callback = slots.output.as_mut()?;
        let mut buf = vec![0.0; frames * 2];
        callback(&mut buf);
        Some(buf)
    }

    fn fail(&self, msg: &str) {
        if let Some(cb) = self.slots.lock().unwrap().error.as_mut() {
            cb(msg);
        }
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn list_output_devices(&self) -> bluesgrid_io::Result<Vec<AudioDevice>> {
        Ok(vec![AudioDevice {
            name: "Mock Out".into(),
            default_sample_rate: self.rate.unwrap_or(SR),
            is_default: true,
        }])
    }

    fn default_output_device(&self) -> bluesgrid_io::Result<Option<AudioDevice>> {
        Ok(self.list_output_devices()?.into_iter().next())
    }

    fn build_output_stream(
        &self,
        _config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> bluesgrid_io::Result<StreamHandle> {
        if self.fail_builds {
            return Err(Error::NoDevice);
        }
        let mut slots = self.slots.lock().unwrap();
        slots.output = Some(callback);
        slots.error = Some(error_callback);
        slots.streams_built += 1;
        Ok(StreamHandle::new(MockStream(Arc::clone(&self.slots))))
    }

    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> bluesgrid_io::Result<u32> {
        Ok(self.rate.unwrap_or(config.sample_rate))
    }
}

fn engine(mock: &MockBackend) -> AudioEngine<MockBackend> {
    AudioEngine::new(mock.clone(), BackendStreamConfig::default())
}

fn energy(buf: &[f32]) -> f32 {
    buf.iter().map(|s| s * s).sum()
}

// ---------------------------------------------------------------------------
// 1. Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn start_creates_and_streams() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert_eq!(eng.state(), EngineState::Uninitialized);
    assert!(eng.start());
    assert_eq!(eng.state(), EngineState::Running);
    assert!(mock.is_streaming());
    assert_eq!(mock.streams_built(), 1);
}

#[test]
fn stop_and_restart_keep_settings() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.create());
    eng.set_master_volume(0.0);
    assert!(eng.start());
    eng.stop();
    assert_eq!(eng.state(), EngineState::Stopped);
    assert!(!mock.is_streaming());

    assert!(eng.start());
    eng.note_on(0, 220.0);
    let out = mock.pull(4800).unwrap();
    // Volume 0 survived the restart.
    assert_eq!(energy(&out), 0.0);
    assert_eq!(mock.streams_built(), 2);
}

#[test]
fn destroy_releases_the_stream() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    eng.note_on(1, 330.0);
    eng.destroy();
    assert_eq!(eng.state(), EngineState::Destroyed);
    assert!(!mock.is_streaming());
    assert!(!eng.start());
    assert!(eng.create());
    assert_eq!(eng.state(), EngineState::Created);
}

#[test]
fn failed_stream_reports_false() {
    let mock = MockBackend {
        fail_builds: true,
        ..MockBackend::default()
    };
    let mut eng = engine(&mock);
    assert!(!eng.start());
    assert!(matches!(eng.try_start(), Err(Error::NoDevice)));
    assert_eq!(eng.state(), EngineState::Created);
}

#[test]
fn synth_runs_at_negotiated_rate() {
    let mock = MockBackend::with_rate(44100);
    let mut eng = engine(&mock);
    assert!(eng.create());
    assert_eq!(eng.sample_rate(), 44100);
    assert_eq!(eng.config().sample_rate, 44100);
}

// ---------------------------------------------------------------------------
// 2. Control calls reach the callback
// ---------------------------------------------------------------------------

#[test]
fn note_on_and_off_through_the_callback() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    assert_eq!(energy(&mock.pull(512).unwrap()), 0.0);

    eng.note_on(0, 220.0);
    assert!(energy(&mock.pull(2400).unwrap()) > 0.0);

    eng.note_off(0);
    // 100 ms release, then the filter tail dies away.
    mock.pull(9600).unwrap();
    assert!(energy(&mock.pull(512).unwrap()) < 1e-10);
}

#[test]
fn stereo_frames_carry_the_same_signal() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    eng.set_wave_type(0);
    eng.note_on(3, 196.0);
    let out = mock.pull(1024).unwrap();
    for frame in out.chunks_exact(2) {
        assert_eq!(frame[0], frame[1]);
    }
}

#[test]
fn all_notes_off_silences_next_block() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    eng.set_instrument_params(InstrumentParams::Guitar(GuitarParams {
        reverb: 1.0,
        ..GuitarParams::default()
    }));
    eng.set_wave_type(4);
    for v in 0..8 {
        eng.note_on(v, 110.0 * (1.0 + v as f32 * 0.25));
    }
    mock.pull(4800).unwrap();
    eng.all_notes_off();
    mock.pull(512).unwrap();
    assert_eq!(energy(&mock.pull(512).unwrap()), 0.0);
}

#[test]
fn calls_before_create_are_ignored() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    eng.note_on(0, 440.0);
    eng.set_pitch_bend(0, 2.0);
    eng.set_wah_enabled(true);
    eng.set_wah_position(0.3);
    eng.set_glide(0.05);
    assert_eq!(eng.state(), EngineState::Uninitialized);
    assert_eq!(eng.dropped_commands(), 0);
}

#[test]
fn full_queue_counts_drops() {
    let mock = MockBackend::default();
    let mut eng = AudioEngine::new(mock.clone(), BackendStreamConfig::default())
        .with_queue_capacity(2);
    assert!(eng.start());
    for _ in 0..5 {
        eng.set_pitch_bend(0, 1.0);
    }
    assert_eq!(eng.dropped_commands(), 3);
    mock.pull(64).unwrap();
    eng.note_on(0, 220.0);
    assert_eq!(eng.dropped_commands(), 3);
}

#[test]
fn apply_routes_commands_like_the_typed_calls() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    eng.apply(Command::NoteOn {
        voice: 1,
        frequency: 330.0,
    });
    assert!(energy(&mock.pull(1024).unwrap()) > 0.0);
    eng.apply(Command::AllNotesOff);
    mock.pull(1024);
    assert_eq!(energy(&mock.pull(256).unwrap()), 0.0);
}

// ---------------------------------------------------------------------------
// 3. Device loss
// ---------------------------------------------------------------------------

#[test]
fn device_loss_returns_to_created() {
    let mock = MockBackend::default();
    let mut eng = engine(&mock);
    assert!(eng.start());
    mock.fail("device unplugged");

    // Observed on the next control call.
    assert_eq!(eng.state(), EngineState::Running);
    assert!(!eng.is_running());
    assert_eq!(eng.state(), EngineState::Created);
    assert!(!mock.is_streaming());

    assert!(eng.start());
    assert_eq!(eng.state(), EngineState::Running);
    eng.note_on(0, 220.0);
    assert!(energy(&mock.pull(2400).unwrap()) > 0.0);
}

// ---------------------------------------------------------------------------
// 4. Offline render, WAV and decode
// ---------------------------------------------------------------------------

#[test]
fn rendered_phrase_round_trips_through_wav() {
    let mut renderer = OfflineRenderer::new(SR, 2);
    let script = [
        ScheduledCommand::new(0.0, Command::SetWaveType(3)),
        ScheduledCommand::new(0.0, Command::NoteOn { voice: 0, frequency: 110.0 }),
        ScheduledCommand::new(0.4, Command::NoteOff { voice: 0 }),
    ];
    let out = renderer.render_script(&script, 0.6);
    assert_eq!(out.len(), (0.6 * SR as f32) as usize * 2);
    assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));

    let file = NamedTempFile::new().unwrap();
    let spec = WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 32,
    };
    write_wav(file.path(), &out, spec).unwrap();

    let mono = read_wav_mono(file.path()).unwrap();
    assert_eq!(mono.sample_rate(), SR);
    assert_eq!(mono.len(), out.len() / 2);
    for (m, frame) in mono.samples().iter().zip(out.chunks_exact(2)) {
        assert!((m - frame[0]).abs() < 1e-6);
    }
}

#[test]
fn wav_bass_line_is_detected_through_symphonia() {
    // A minor: A1 C2 E2 A1, two seconds each, 44.1 kHz stereo, 16 bit.
    let sr = 44100u32;
    let mut interleaved = Vec::new();
    for &(freq, secs) in &[(55.0f32, 2.0f32), (65.41, 1.0), (82.41, 1.0), (55.0, 2.0)] {
        let n = (sr as f32 * secs) as usize;
        for i in 0..n {
            let s = 0.5 * (std::f32::consts::TAU * freq * i as f32 / sr as f32).sin();
            interleaved.push(s);
            interleaved.push(s);
        }
    }
    let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 16,
    };
    write_wav(file.path(), &interleaved, spec).unwrap();

    let info = media_info(file.path()).unwrap();
    assert_eq!(info.sample_rate, Some(sr));
    assert_eq!(info.channels, Some(2));
    assert!((info.duration_secs.unwrap() - 6.0).abs() < 0.01);

    let mut source = FileSource::new(file.path());
    let result = KeyDetector::default().detect(&mut source);
    assert_eq!(result.outcome, DetectionOutcome::Detected);
    assert_eq!(result.key.root, Note::A);
    assert_eq!(result.key.scale, ScaleType::Minor);
    // 44.1 kHz decimates by 2.
    assert!((result.analyzed_secs - 6.0).abs() < 0.05);
}

#[test]
fn non_audio_file_is_a_failed_detection() {
    let file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
    std::fs::write(file.path(), b"definitely not an mp3 frame").unwrap();
    let result = KeyDetector::default().detect(&mut FileSource::new(file.path()));
    assert_eq!(result.outcome, DetectionOutcome::Failed);
    assert_eq!(result.confidence, 0.0);
}
