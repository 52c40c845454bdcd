//! Pluggable audio output abstraction.
//!
//! [`AudioBackend`] decouples the engine from the platform audio API. The
//! default implementation wraps cpal ([`CpalBackend`](crate::CpalBackend));
//! tests drive a mock backend that calls the output callback by hand.
//!
//! ```text
//! AudioEngine ──▶ AudioBackend::build_output_stream(config, callback, on_error)
//!                        │
//!                        ▼
//!                 StreamHandle (plays until dropped)
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe. The stream
//! is returned as a type-erased [`StreamHandle`]; dropping it stops output.

use crate::Result;

/// An output device as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the system default output.
    pub is_default: bool,
}

/// Configuration for building an output stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved output channels.
    pub channels: u16,
    /// Device name filter (system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream handle. Output runs while the handle is alive.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback, run on the real-time thread.
///
/// Receives interleaved f32 frames (`[L0, R0, L1, R1, ...]`) to fill. It must
/// not allocate, lock or perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Stream error callback. Receives a human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Platform audio output.
pub trait AudioBackend: Send {
    /// Backend identifier, e.g. `"cpal"`.
    fn name(&self) -> &'static str;

    /// Enumerate output devices.
    fn list_output_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The system default output, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Open and start an output stream.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// The sample rate a stream built from `config` will actually run at.
    ///
    /// Backends that cannot honor the request return the device's rate.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> Result<u32> {
        Ok(config.sample_rate)
    }
}
