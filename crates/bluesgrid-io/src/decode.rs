//! Compressed-audio decoding for key detection.
//!
//! [`FileSource`] opens a media file with symphonia and feeds the decoded
//! frames through a [`PcmCollector`], which mixes to mono, decimates towards
//! the analysis rate and stops at the length cap. The cancellation token is
//! checked between packets.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bluesgrid_keydetect::{
    CancelToken, DecodeLimits, DecodeOutcome, DetectError, PcmBuffer, PcmCollector, PcmSource,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::{Error, Result};

/// How a [`FileSource`] treats damaged input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderSettings {
    /// Skip packets that fail to decode instead of aborting.
    pub skip_corrupt_packets: bool,
    /// Container hint; the file extension is used when `None`.
    pub extension_hint: Option<String>,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            skip_corrupt_packets: true,
            extension_hint: None,
        }
    }
}

/// Stream facts read from a file header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Codec short name, e.g. `"mp3"`.
    pub codec: String,
    /// Sample rate in Hz, if declared.
    pub sample_rate: Option<u32>,
    /// Channel count, if declared.
    pub channels: Option<usize>,
    /// Duration in seconds, if the container knows the frame count.
    pub duration_secs: Option<f64>,
}

fn open_format(path: &Path, extension_hint: Option<&str>) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint.or_else(|| path.extension().and_then(|e| e.to_str())) {
        hint.with_extension(ext);
    }

    let opened = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(opened.format)
}

fn audio_track(format: &dyn FormatReader) -> Option<&Track> {
    format
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .or_else(|| {
            format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        })
}

/// Read the stream description of `path` without decoding audio.
pub fn media_info(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let path = path.as_ref();
    let format = open_format(path, None)?;
    let track = audio_track(&*format)
        .ok_or_else(|| Error::NoAudioTrack(path.display().to_string()))?;
    let params = &track.codec_params;

    let codec = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map_or_else(|| "unknown".to_string(), |d| d.short_name.to_string());
    let duration_secs = match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / f64::from(rate)),
        _ => None,
    };

    Ok(MediaInfo {
        codec,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
        duration_secs,
    })
}

/// A media file decoded with symphonia.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    settings: DecoderSettings,
}

impl FileSource {
    /// Decode `path` with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_settings(path, DecoderSettings::default())
    }

    /// Decode `path` with `settings`.
    pub fn with_settings(path: impl Into<PathBuf>, settings: DecoderSettings) -> Self {
        Self {
            path: path.into(),
            settings,
        }
    }

    /// The file being decoded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_file(
        &self,
        limits: &DecodeLimits,
        cancel: &CancelToken,
    ) -> Result<Option<PcmBuffer>> {
        let mut format = open_format(&self.path, self.settings.extension_hint.as_deref())?;
        let Some(track) = audio_track(&*format) else {
            return Ok(None);
        };
        let track_id = track.id;
        let declared_rate = track.codec_params.sample_rate;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        tracing::info!(
            path = %self.path.display(),
            sample_rate = ?declared_rate,
            "decoding for key detection"
        );

        let mut collector: Option<PcmCollector> = None;
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut skipped = 0usize;

        while !cancel.should_stop() {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) if self.settings.skip_corrupt_packets => {
                    skipped += 1;
                    tracing::debug!(error = msg, "skipping corrupt packet");
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let needed = decoded.capacity() * channels;
            let buf = match sample_buf.take() {
                Some(buf) if buf.capacity() >= needed => sample_buf.insert(buf),
                _ => sample_buf.insert(SampleBuffer::new(decoded.capacity() as u64, spec)),
            };
            buf.copy_interleaved_ref(decoded);

            let collector =
                collector.get_or_insert_with(|| PcmCollector::new(limits, spec.rate, channels));
            if collector.push_interleaved(buf.samples()) {
                break;
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "corrupt packets skipped");
        }
        let buffer = match collector {
            Some(collector) => collector.finish(),
            None => PcmBuffer::new(Vec::new(), limits.target_rate),
        };
        tracing::info!(
            samples = buffer.len(),
            sample_rate = buffer.sample_rate(),
            seconds = buffer.duration_secs(),
            "decode finished"
        );
        Ok(Some(buffer))
    }
}

impl PcmSource for FileSource {
    fn decode(
        &mut self,
        limits: &DecodeLimits,
        cancel: &CancelToken,
    ) -> bluesgrid_keydetect::Result<DecodeOutcome> {
        match self.decode_file(limits, cancel) {
            Ok(Some(buffer)) => Ok(DecodeOutcome::Decoded(buffer)),
            Ok(None) => Ok(DecodeOutcome::NoAudioTrack),
            Err(Error::Decode(SymphoniaError::Unsupported(what))) => {
                Err(DetectError::Unsupported(what.to_string()))
            }
            Err(err) => Err(DetectError::decode(err)),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
