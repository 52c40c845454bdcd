//! WAV file reading and writing.

use std::path::Path;

use bluesgrid_keydetect::PcmBuffer;
use hound::{SampleFormat, WavReader, WavWriter};

use crate::Result;

/// WAV format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth: 32 writes float, anything else integer PCM.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Write interleaved samples to a WAV file.
///
/// Integer formats are clamped to full scale.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let mut writer = WavWriter::create(path.as_ref(), hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        samples = samples.len(),
        channels = spec.channels,
        "wav written"
    );
    Ok(())
}

/// Read a WAV file mixed down to mono.
pub fn read_wav_mono<P: AsRef<Path>>(path: P) -> Result<PcmBuffer> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(PcmBuffer::new(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn float_round_trip_is_exact() {
        let samples: Vec<f32> = (0..480).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let loaded = read_wav_mono(file.path()).unwrap();
        assert_eq!(loaded.sample_rate(), 48000);
        assert_eq!(loaded.samples(), samples.as_slice());
    }

    #[test]
    fn stereo_is_averaged() {
        let interleaved = [0.5f32, -0.5, 1.0, 0.0, 0.2, 0.2];
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &interleaved, spec).unwrap();

        let loaded = read_wav_mono(file.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!((loaded.samples()[0]).abs() < 1e-6);
        assert!((loaded.samples()[1] - 0.5).abs() < 1e-6);
        assert!((loaded.samples()[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn sixteen_bit_clamps_overs() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &[2.0, -2.0, 0.25], spec).unwrap();

        let loaded = read_wav_mono(file.path()).unwrap();
        let s = loaded.samples();
        assert!(s[0] > 0.999 && s[0] < 1.0);
        assert_eq!(s[1], -1.0);
        assert!((s[2] - 0.25).abs() < 1e-4);
    }
}
