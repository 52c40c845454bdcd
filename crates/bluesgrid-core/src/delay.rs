//! Circular delay line with linear fractional reads.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Heap-backed circular delay line.
///
/// `read(0.0)` returns the most recently written sample; `read(d)` the sample
/// written `d` writes before it, interpolating linearly between neighbours
/// for fractional `d`.
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl InterpolatedDelay {
    /// Allocate a delay holding `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    /// Allocate enough room for `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds).max(0.0) as usize + 2)
    }

    /// Read `delay_samples` behind the write head. Clamped to the capacity.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let max = (len - 1) as f32;
        let delay = if delay_samples.is_finite() {
            delay_samples.clamp(0.0, max)
        } else {
            0.0
        };

        let whole = delay as usize;
        let frac = delay - whole as f32;

        let pos = (self.write_pos + len - whole - 1) % len;
        let older = (pos + len - 1) % len;

        let a = self.buffer[pos];
        let b = self.buffer[older];
        a + (b - a) * frac
    }

    /// Push one sample.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Number of samples held.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
