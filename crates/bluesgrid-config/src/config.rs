//! The application configuration file.

use std::path::Path;
use std::time::Duration;

use bluesgrid_io::{AudioBackend, AudioEngine, BackendStreamConfig};
use bluesgrid_keydetect::{DetectionConfig, TrackerConfig};
use bluesgrid_synth::{
    BassParams, Command, DEFAULT_MASTER_VOLUME, DrumParams, GuitarParams, InstrumentParams,
    InstrumentSettings, OrganParams, SynthParams,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::validation::validate_config;

/// `[audio]`: device and global synth settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Output channels.
    pub channels: u16,
    /// Master volume in [0, 1].
    pub master_volume: f32,
    /// Output device name filter.
    pub device: Option<String>,
    /// Instrument for new notes (0 organ, 1 synth, 2 drums, 3 bass, 4 guitar,
    /// 5 square, 6 triangle, 7 sine).
    pub wave_type: i32,
    /// Portamento time in milliseconds.
    pub glide_ms: f32,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            master_volume: DEFAULT_MASTER_VOLUME,
            device: None,
            wave_type: 1,
            glide_ms: 0.0,
        }
    }
}

/// `[guitar]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuitarSection {
    /// String feedback and decay floor.
    pub sustain: f32,
    /// Preamp gain.
    pub gain: f32,
    /// Distortion drive.
    pub distortion: f32,
    /// Reverb send.
    pub reverb: f32,
}

/// `[organ]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganSection {
    /// Drawbar mix brightness.
    pub drawbar: f32,
    /// Rotary speaker depth.
    pub leslie: f32,
    /// Chorus depth.
    pub chorus: f32,
    /// Preamp overdrive.
    pub overdrive: f32,
}

/// `[synth]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthSection {
    /// Attack time.
    pub attack: f32,
    /// Filter cutoff.
    pub filter: f32,
    /// Filter resonance.
    pub resonance: f32,
    /// Chorus depth.
    pub chorus: f32,
}

/// `[bass]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BassSection {
    /// Brightness.
    pub tone: f32,
    /// Pluck attack.
    pub attack: f32,
    /// Note length.
    pub sustain: f32,
    /// Amp squeeze.
    pub compression: f32,
}

/// `[drums]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumsSection {
    /// Kick level.
    pub kick: f32,
    /// Snare level.
    pub snare: f32,
    /// Hi-hat and cymbal level.
    pub hihat: f32,
    /// Tom level.
    pub tom: f32,
}

// Each section mirrors a synth params struct field for field.
macro_rules! params_section {
    ($section:ident, $params:ident, $($field:ident),+) => {
        impl Default for $section {
            fn default() -> Self {
                $params::default().into()
            }
        }

        impl From<$params> for $section {
            fn from(p: $params) -> Self {
                Self { $($field: p.$field),+ }
            }
        }

        impl From<$section> for $params {
            fn from(s: $section) -> Self {
                Self { $($field: s.$field),+ }
            }
        }
    };
}

params_section!(GuitarSection, GuitarParams, sustain, gain, distortion, reverb);
params_section!(OrganSection, OrganParams, drawbar, leslie, chorus, overdrive);
params_section!(SynthSection, SynthParams, attack, filter, resonance, chorus);
params_section!(BassSection, BassParams, tone, attack, sustain, compression);
params_section!(DrumsSection, DrumParams, kick, snare, hihat, tom);

/// `[wah]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WahSection {
    /// Pedal engaged at start.
    pub enabled: bool,
    /// Pedal position for manual mode.
    pub position: f32,
    /// Use `position` instead of the auto-sweep.
    pub manual: bool,
}

impl Default for WahSection {
    fn default() -> Self {
        Self {
            enabled: false,
            position: 0.5,
            manual: false,
        }
    }
}

/// `[detection]`: key detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSection {
    /// Decimation target in Hz.
    pub analysis_rate: u32,
    /// Longest analyzed stretch in seconds.
    pub max_duration_secs: f32,
    /// Pitch window in samples.
    pub window_size: usize,
    /// Window advance in samples.
    pub hop_size: usize,
    /// Bass low-pass cutoff.
    pub lowpass_cutoff_hz: f32,
    /// Mean-square energy gate.
    pub energy_threshold: f32,
    /// Normalized autocorrelation needed for a pitch.
    pub correlation_threshold: f32,
    /// Lowest tracked fundamental.
    pub min_frequency_hz: f32,
    /// Highest tracked fundamental.
    pub max_frequency_hz: f32,
    /// Take the shortest-period peak near the autocorrelation maximum.
    pub prefer_shortest_period: bool,
    /// Pitched windows needed for a conclusive key.
    pub min_windows: u32,
    /// Deadline for one detection run.
    pub timeout_secs: f32,
}

impl Default for DetectionSection {
    fn default() -> Self {
        let d = DetectionConfig::default();
        let t = d.tracker;
        Self {
            analysis_rate: d.analysis_rate,
            max_duration_secs: d.max_duration_secs,
            window_size: t.window_size,
            hop_size: t.hop_size,
            lowpass_cutoff_hz: t.lowpass_cutoff_hz,
            energy_threshold: t.energy_threshold,
            correlation_threshold: t.correlation_threshold,
            min_frequency_hz: t.min_frequency_hz,
            max_frequency_hz: t.max_frequency_hz,
            prefer_shortest_period: t.prefer_shortest_period,
            min_windows: d.min_windows,
            timeout_secs: d.timeout.as_secs_f32(),
        }
    }
}

impl DetectionSection {
    /// Detector settings. A timeout that cannot be represented falls back
    /// to the default.
    pub fn to_detection_config(&self) -> DetectionConfig {
        let defaults = DetectionConfig::default();
        DetectionConfig {
            analysis_rate: self.analysis_rate,
            max_duration_secs: self.max_duration_secs,
            tracker: TrackerConfig {
                window_size: self.window_size,
                hop_size: self.hop_size,
                lowpass_cutoff_hz: self.lowpass_cutoff_hz,
                energy_threshold: self.energy_threshold,
                correlation_threshold: self.correlation_threshold,
                min_frequency_hz: self.min_frequency_hz,
                max_frequency_hz: self.max_frequency_hz,
                prefer_shortest_period: self.prefer_shortest_period,
                ..defaults.tracker
            },
            min_windows: self.min_windows,
            timeout: Duration::try_from_secs_f32(self.timeout_secs).unwrap_or(defaults.timeout),
        }
    }
}

/// The whole configuration file. Missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[audio]`
    pub audio: AudioSection,
    /// `[guitar]`
    pub guitar: GuitarSection,
    /// `[organ]`
    pub organ: OrganSection,
    /// `[synth]`
    pub synth: SynthSection,
    /// `[bass]`
    pub bass: BassSection,
    /// `[drums]`
    pub drums: DrumsSection,
    /// `[wah]`
    pub wah: WahSection,
    /// `[detection]`
    pub detection: DetectionSection,
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as TOML, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_config(self)?)
    }

    /// Instrument effect settings.
    pub fn instrument_settings(&self) -> InstrumentSettings {
        InstrumentSettings {
            guitar: self.guitar.into(),
            organ: self.organ.into(),
            synth: self.synth.into(),
            bass: self.bass.into(),
            drums: self.drums.into(),
        }
    }

    /// Output stream settings.
    pub fn stream_config(&self) -> BackendStreamConfig {
        BackendStreamConfig {
            sample_rate: self.audio.sample_rate,
            buffer_size: self.audio.buffer_size,
            channels: self.audio.channels,
            device_name: self.audio.device.clone(),
        }
    }

    /// Key detector settings.
    pub fn detection_config(&self) -> DetectionConfig {
        self.detection.to_detection_config()
    }

    /// Commands that bring a fresh synth to this configuration.
    pub fn initial_commands(&self) -> Vec<Command> {
        let s = self.instrument_settings();
        let mut commands = vec![
            Command::SetMasterVolume(self.audio.master_volume),
            Command::SetWaveType(self.audio.wave_type),
            Command::SetGlide(self.audio.glide_ms / 1000.0),
            Command::SetParams(InstrumentParams::Guitar(s.guitar)),
            Command::SetParams(InstrumentParams::Organ(s.organ)),
            Command::SetParams(InstrumentParams::Synth(s.synth)),
            Command::SetParams(InstrumentParams::Bass(s.bass)),
            Command::SetParams(InstrumentParams::Drums(s.drums)),
            Command::SetWahEnabled(self.wah.enabled),
        ];
        if self.wah.manual {
            commands.push(Command::SetWahPosition(self.wah.position));
        }
        commands
    }

    /// Push this configuration into a running or created engine.
    pub fn apply_to_engine<B: AudioBackend>(&self, engine: &mut AudioEngine<B>) {
        for command in self.initial_commands() {
            engine.apply(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_defaults_match_the_synth() {
        let config = AppConfig::default();
        assert_eq!(config.instrument_settings(), InstrumentSettings::default());
        assert_eq!(config.guitar.sustain, 0.9);
        assert_eq!(config.organ.drawbar, 0.8);
        assert_eq!(config.drums.hihat, 0.6);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = AppConfig::from_toml("[guitar]\nreverb = 0.1\n").unwrap();
        assert_eq!(config.guitar.reverb, 0.1);
        assert_eq!(config.guitar.gain, GuitarParams::default().gain);
        assert_eq!(config.audio, AudioSection::default());
        assert_eq!(config.detection, DetectionSection::default());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let err = AppConfig::from_toml("[organ]\nleslie = 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("organ.leslie"));
    }

    #[test]
    fn detection_round_trips_into_detector_settings() {
        let config = AppConfig::default().detection_config();
        let defaults = DetectionConfig::default();
        assert_eq!(config.tracker, defaults.tracker);
        assert_eq!(config.timeout, defaults.timeout);
        assert_eq!(config.analysis_rate, defaults.analysis_rate);
    }

    #[test]
    fn shortest_period_is_opt_in() {
        assert!(!AppConfig::default().detection_config().tracker.prefer_shortest_period);
        let config =
            AppConfig::from_toml("[detection]\nprefer_shortest_period = true\n").unwrap();
        assert!(config.detection_config().tracker.prefer_shortest_period);
    }

    #[test]
    fn unrepresentable_timeout_falls_back() {
        let section = DetectionSection {
            timeout_secs: f32::INFINITY,
            ..DetectionSection::default()
        };
        assert_eq!(section.to_detection_config().timeout, Duration::from_secs(8));
    }

    #[test]
    fn manual_wah_adds_a_position_command() {
        let mut config = AppConfig::default();
        assert!(!config
            .initial_commands()
            .iter()
            .any(|c| matches!(c, Command::SetWahPosition(_))));
        config.wah.manual = true;
        config.wah.position = 0.2;
        assert!(config.initial_commands().contains(&Command::SetWahPosition(0.2)));
    }
}
