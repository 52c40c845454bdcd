//! Configuration file for bluesgrid.
//!
//! One TOML file holds the audio device settings, the effect settings of
//! every instrument, the wah pedal and the key detector tuning:
//!
//! ```toml
//! [audio]
//! sample_rate = 48000
//! master_volume = 0.8
//! wave_type = 4
//!
//! [guitar]
//! distortion = 0.5
//!
//! [detection]
//! timeout_secs = 8.0
//! ```
//!
//! Every section and field is optional. Loading validates the whole file
//! and reports each out-of-range field by its dotted path.
//!
//! # Example
//!
//! ```rust,no_run
//! use bluesgrid_config::{AppConfig, default_config_path};
//!
//! let config = AppConfig::load_or_default(default_config_path()).unwrap();
//! let detector = bluesgrid_keydetect::KeyDetector::new(config.detection_config());
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range checks for configuration values.
pub mod validation;

pub use config::{
    AppConfig, AudioSection, BassSection, DetectionSection, DrumsSection, GuitarSection,
    OrganSection, SynthSection, WahSection,
};
pub use error::ConfigError;
pub use paths::{CONFIG_FILE_NAME, default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_config};
