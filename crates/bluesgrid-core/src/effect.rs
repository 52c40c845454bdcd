//! The mono processor trait shared by every effect stage.

/// A mono audio processor.
///
/// Object safe, so instrument chains can hold stages as `&mut dyn Effect`
/// when the concrete type does not matter.
pub trait Effect {
    /// Process one sample.
    fn process(&mut self, input: f32) -> f32;

    /// Process a buffer in place.
    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Update internal coefficients for a new sample rate.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear all internal state (delay memory, filter integrators).
    fn reset(&mut self);
}
