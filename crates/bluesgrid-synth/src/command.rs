//! Control-to-audio command queue.
//!
//! A bounded crossbeam channel carries small `Copy` records from the control
//! thread to the audio callback. Both ends are non-blocking: `try_send`
//! drops the newest command when the queue is full, and the audio side only
//! ever calls `try_recv`, which does not allocate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::params::InstrumentParams;

/// Default queue depth. Generous for touch input at UI frame rates.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A state change for the audio thread, applied in enqueue order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Start a note on a voice slot.
    NoteOn {
        /// Voice slot.
        voice: usize,
        /// Frequency in Hz.
        frequency: f32,
    },
    /// Release a voice slot.
    NoteOff {
        /// Voice slot.
        voice: usize,
    },
    /// Bend a voice slot.
    SetPitchBend {
        /// Voice slot.
        voice: usize,
        /// Offset in semitones.
        semitones: f32,
    },
    /// Replace one instrument's effect settings.
    SetParams(InstrumentParams),
    /// Master volume in [0, 1].
    SetMasterVolume(f32),
    /// Select the instrument for new notes by wave-type code.
    SetWaveType(i32),
    /// Portamento time in seconds.
    SetGlide(f32),
    /// Engage or bypass the wah.
    SetWahEnabled(bool),
    /// Wah pedal position in [0, 1].
    SetWahPosition(f32),
    /// Release every voice within one callback period.
    AllNotesOff,
}

/// Create a connected sender/receiver pair holding at most `capacity` commands.
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        CommandSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        CommandReceiver { rx },
    )
}

/// Producer half, held by the control surface.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl CommandSender {
    /// Enqueue without blocking. Returns `false` if the command was dropped
    /// because the queue is full or the audio side is gone.
    pub fn send(&self, command: Command) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Commands dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Commands waiting to be applied.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// Consumer half, owned by the audio callback.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// Pop the oldest command, if any.
    #[inline]
    pub fn try_recv(&self) -> Option<Command> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Apply at most `max` commands in order. Returns how many were applied.
    #[inline]
    pub fn drain(&self, max: usize, mut apply: impl FnMut(Command)) -> usize {
        let mut applied = 0;
        while applied < max {
            let Some(command) = self.try_recv() else {
                break;
            };
            apply(command);
            applied += 1;
        }
        applied
    }
}
