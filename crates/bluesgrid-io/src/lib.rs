//! Audio I/O layer for bluesgrid.
//!
//! This crate provides:
//!
//! - **Device output**: the [`AudioBackend`] trait with a cpal implementation
//!   ([`CpalBackend`]) and the [`AudioEngine`] control surface that owns the
//!   stream and talks to the synth through its command queue
//! - **Decoding**: [`FileSource`], a symphonia-backed [`PcmSource`] feeding the
//!   key detector
//! - **WAV files**: [`write_wav`] and [`read_wav_mono`] via hound
//! - **Offline rendering**: [`OfflineRenderer`] runs the synth into a buffer
//!   without a device
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bluesgrid_io::{AudioEngine, BackendStreamConfig, CpalBackend};
//!
//! let mut engine = AudioEngine::new(CpalBackend::new(), BackendStreamConfig::default());
//! if engine.start() {
//!     engine.note_on(0, 220.0);
//!     std::thread::sleep(std::time::Duration::from_millis(500));
//!     engine.note_off(0);
//! }
//! engine.destroy();
//! ```
//!
//! [`PcmSource`]: bluesgrid_keydetect::PcmSource

pub mod backend;
pub mod cpal_backend;
pub mod decode;
pub mod engine;
pub mod render;
pub mod wav;

pub use backend::{
    AudioBackend, AudioDevice, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle,
};
pub use cpal_backend::{CpalBackend, list_output_devices};
pub use decode::{DecoderSettings, FileSource, MediaInfo, media_info};
pub use engine::{AudioEngine, EngineState};
pub use render::{OfflineRenderer, ScheduledCommand};
pub use wav::{WavSpec, read_wav_mono, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Container or codec error while decoding.
    #[error("Decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The media has no decodable audio track.
    #[error("No audio track in {0}")]
    NoAudioTrack(String),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The engine was asked to do something its current state forbids.
    #[error("Invalid engine state: {0}")]
    InvalidState(&'static str),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
