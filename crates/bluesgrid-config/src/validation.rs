//! Range checks for configuration values.
//!
//! Validation walks the whole configuration and reports every bad field
//! with its dotted path (`guitar.reverb`, `detection.hop_size`) rather than
//! stopping at the first one.

use thiserror::Error;

use crate::config::AppConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field path.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value violates a relation with another field.
    #[error("'{field}' is invalid: {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accumulates field errors.
#[derive(Debug, Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        // NaN fails both comparisons, so test for containment.
        if !(min..=max).contains(&value) {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn unit(&mut self, field: &str, value: f32) {
        self.range(field, f64::from(value), 0.0, 1.0);
    }

    fn invalid(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Check every field of `config`.
pub fn validate_config(config: &AppConfig) -> ValidationResult<()> {
    let mut c = Checker::default();

    let a = &config.audio;
    c.range("audio.sample_rate", f64::from(a.sample_rate), 8000.0, 192_000.0);
    c.range("audio.buffer_size", f64::from(a.buffer_size), 16.0, 8192.0);
    c.range("audio.channels", f64::from(a.channels), 1.0, 8.0);
    c.unit("audio.master_volume", a.master_volume);
    c.range("audio.wave_type", f64::from(a.wave_type), 0.0, 7.0);
    c.range("audio.glide_ms", f64::from(a.glide_ms), 0.0, 2000.0);
    if a.device.as_deref().is_some_and(|d| d.trim().is_empty()) {
        c.invalid("audio.device", "empty device name");
    }

    let g = &config.guitar;
    c.unit("guitar.sustain", g.sustain);
    c.unit("guitar.gain", g.gain);
    c.unit("guitar.distortion", g.distortion);
    c.unit("guitar.reverb", g.reverb);

    let o = &config.organ;
    c.unit("organ.drawbar", o.drawbar);
    c.unit("organ.leslie", o.leslie);
    c.unit("organ.chorus", o.chorus);
    c.unit("organ.overdrive", o.overdrive);

    let s = &config.synth;
    c.unit("synth.attack", s.attack);
    c.unit("synth.filter", s.filter);
    c.unit("synth.resonance", s.resonance);
    c.unit("synth.chorus", s.chorus);

    let b = &config.bass;
    c.unit("bass.tone", b.tone);
    c.unit("bass.attack", b.attack);
    c.unit("bass.sustain", b.sustain);
    c.unit("bass.compression", b.compression);

    let d = &config.drums;
    c.unit("drums.kick", d.kick);
    c.unit("drums.snare", d.snare);
    c.unit("drums.hihat", d.hihat);
    c.unit("drums.tom", d.tom);

    c.unit("wah.position", config.wah.position);

    let det = &config.detection;
    c.range("detection.analysis_rate", f64::from(det.analysis_rate), 4000.0, 96_000.0);
    c.range("detection.max_duration_secs", f64::from(det.max_duration_secs), 1.0, 600.0);
    c.range("detection.window_size", det.window_size as f64, 256.0, 65_536.0);
    if det.hop_size == 0 || det.hop_size > det.window_size {
        c.invalid("detection.hop_size", "must be between 1 and window_size");
    }
    c.range("detection.lowpass_cutoff_hz", f64::from(det.lowpass_cutoff_hz), 20.0, 2000.0);
    c.range("detection.energy_threshold", f64::from(det.energy_threshold), 0.0, 1.0);
    c.range(
        "detection.correlation_threshold",
        f64::from(det.correlation_threshold),
        0.0,
        1.0,
    );
    c.range("detection.min_frequency_hz", f64::from(det.min_frequency_hz), 10.0, 2000.0);
    c.range("detection.max_frequency_hz", f64::from(det.max_frequency_hz), 10.0, 2000.0);
    if det.min_frequency_hz >= det.max_frequency_hz {
        c.invalid("detection.min_frequency_hz", "must be below max_frequency_hz");
    }
    c.range("detection.timeout_secs", f64::from(det.timeout_secs), 0.1, 600.0);

    c.finish()
}
