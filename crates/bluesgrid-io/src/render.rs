//! Device-free rendering.
//!
//! [`OfflineRenderer`] runs a [`SynthEngine`] into memory, either block by
//! block or from a timed list of commands. Scheduled commands land on their
//! exact frame: blocks are split at every event.

use bluesgrid_synth::{Command, CommandSender, DEFAULT_QUEUE_CAPACITY, SynthEngine, command_queue};

/// Default render block in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// A command applied at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledCommand {
    /// Time from the start of the render, in seconds.
    pub at_secs: f32,
    /// What to apply.
    pub command: Command,
}

impl ScheduledCommand {
    /// `command` at `at_secs`.
    pub fn new(at_secs: f32, command: Command) -> Self {
        Self { at_secs, command }
    }
}

/// A synth rendering into buffers instead of a device.
#[derive(Debug)]
pub struct OfflineRenderer {
    synth: SynthEngine,
    sender: CommandSender,
    sample_rate: u32,
    channels: usize,
    block_size: usize,
    frames_rendered: u64,
}

impl OfflineRenderer {
    /// A renderer producing `channels` interleaved channels at `sample_rate`.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let (sender, receiver) = command_queue(DEFAULT_QUEUE_CAPACITY);
        Self {
            synth: SynthEngine::new(sample_rate as f32, receiver),
            sender,
            sample_rate: sample_rate.max(1),
            channels: usize::from(channels.max(1)),
            block_size: DEFAULT_BLOCK_SIZE,
            frames_rendered: 0,
        }
    }

    /// Render in blocks of at most `frames`.
    pub fn with_block_size(mut self, frames: usize) -> Self {
        self.block_size = frames.max(1);
        self
    }

    /// Queue handle, as a control thread would hold it.
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// The synth being rendered.
    pub fn synth(&self) -> &SynthEngine {
        &self.synth
    }

    /// Apply a command before the next rendered frame.
    pub fn apply(&mut self, command: Command) {
        self.synth.apply(command);
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Time rendered so far, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.sample_rate)
    }

    /// Fill `out` with interleaved frames.
    pub fn render_into(&mut self, out: &mut [f32]) {
        let step = self.block_size * self.channels;
        for block in out.chunks_mut(step) {
            self.synth.render(block, self.channels);
        }
        self.frames_rendered += (out.len() / self.channels) as u64;
    }

    /// Render `frames` frames.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.channels];
        self.render_into(&mut out);
        out
    }

    /// Render `duration_secs`, applying each event on its frame.
    ///
    /// Event times are relative to the start of this call. Events past the
    /// end are ignored; negative times apply immediately.
    pub fn render_script(&mut self, events: &[ScheduledCommand], duration_secs: f32) -> Vec<f32> {
        let sr = self.sample_rate as f32;
        let total = (duration_secs.max(0.0) * sr) as usize;

        let mut timeline: Vec<(usize, Command)> = events
            .iter()
            .filter(|e| !e.at_secs.is_nan())
            .map(|e| ((e.at_secs.max(0.0) * sr) as usize, e.command))
            .filter(|&(frame, _)| frame < total)
            .collect();
        timeline.sort_by_key(|&(frame, _)| frame);

        let mut out = vec![0.0; total * self.channels];
        let mut next = timeline.iter().peekable();
        let mut pos = 0;
        while pos < total {
            while let Some(&(_, command)) = next.next_if(|&&(frame, _)| frame <= pos) {
                self.synth.apply(command);
            }
            let until = next.peek().map_or(total, |&&(frame, _)| frame);
            let end = until.min(pos + self.block_size).min(total);
            self.synth
                .render(&mut out[pos * self.channels..end * self.channels], self.channels);
            pos = end;
        }
        self.frames_rendered += total as u64;
        out
    }
}
