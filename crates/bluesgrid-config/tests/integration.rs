//! Integration tests for bluesgrid-config.
//!
//! Files on disk, and configurations driving the synth and detector.

use bluesgrid_config::{AppConfig, ConfigError, ValidationError};
use bluesgrid_io::OfflineRenderer;
use bluesgrid_keydetect::KeyDetector;
use bluesgrid_synth::Command;
use tempfile::TempDir;

const SR: u32 = 48000;

// ---------------------------------------------------------------------------
// 1. Files
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.audio.device = Some("USB Audio".into());
    config.audio.wave_type = 4;
    config.guitar.distortion = 0.25;
    config.wah.enabled = true;
    config.detection.timeout_secs = 4.0;
    config.save(&path).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());

    let err = AppConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn bad_file_reports_every_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[audio]\nmaster_volume = 3.0\n\n[bass]\ncompression = -1.0\n",
    )
    .unwrap();

    match AppConfig::load(&path) {
        Err(ConfigError::Validation(ValidationError::Multiple(errors))) => {
            assert_eq!(errors.len(), 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = AppConfig::from_toml("[audio\nsample_rate = 48000").unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)));
    let err = AppConfig::from_toml("[audio]\nsample_rate = \"fast\"").unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)));
}

// ---------------------------------------------------------------------------
// 2. Driving the engine and detector
// ---------------------------------------------------------------------------

#[test]
fn initial_commands_configure_a_fresh_synth() {
    let config = AppConfig::from_toml(
        "[audio]\nmaster_volume = 0.5\nwave_type = 4\n\n[guitar]\nreverb = 0.0\n",
    )
    .unwrap();

    let mut renderer = OfflineRenderer::new(SR, 2);
    for command in config.initial_commands() {
        renderer.apply(command);
    }
    let synth = renderer.synth();
    assert_eq!(synth.master_volume(), 0.5);
    assert_eq!(synth.settings().guitar.reverb, 0.0);
    assert_eq!(*synth.settings(), config.instrument_settings());

    renderer.apply(Command::NoteOn {
        voice: 0,
        frequency: 196.0,
    });
    let out = renderer.render_frames(4800);
    assert!(out.iter().any(|&s| s != 0.0));
}

#[test]
fn stream_config_follows_audio_section() {
    let config =
        AppConfig::from_toml("[audio]\nsample_rate = 44100\nbuffer_size = 128\nchannels = 1\n")
            .unwrap();
    let stream = config.stream_config();
    assert_eq!(stream.sample_rate, 44100);
    assert_eq!(stream.buffer_size, 128);
    assert_eq!(stream.channels, 1);
    assert!(stream.device_name.is_none());
}

#[test]
fn detection_section_tunes_the_detector() {
    let config = AppConfig::from_toml(
        "[detection]\nmin_windows = 25\nhop_size = 1024\ntimeout_secs = 2.5\n",
    )
    .unwrap();
    let detector = KeyDetector::new(config.detection_config());
    let c = detector.config();
    assert_eq!(c.min_windows, 25);
    assert_eq!(c.tracker.hop_size, 1024);
    assert_eq!(c.timeout.as_millis(), 2500);
}
