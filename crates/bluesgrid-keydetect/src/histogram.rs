//! Pitch-class occurrence counts.

use serde::{Deserialize, Serialize};

use crate::key::Note;

/// Twelve-bin histogram of detected pitch classes, indexed by semitone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHistogram {
    counts: [u32; 12],
}

impl NoteHistogram {
    /// Empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram from raw counts, C first.
    pub fn from_counts(counts: [u32; 12]) -> Self {
        Self { counts }
    }

    /// Count one occurrence of `note`.
    pub fn increment(&mut self, note: Note) {
        self.add(note, 1);
    }

    /// Count `n` occurrences of `note`.
    pub fn add(&mut self, note: Note, n: u32) {
        let bin = &mut self.counts[note.semitone() as usize];
        *bin = bin.saturating_add(n);
    }

    /// Occurrences of `note`.
    pub fn count(&self, note: Note) -> u32 {
        self.counts[note.semitone() as usize]
    }

    /// Raw counts, C first.
    pub fn counts(&self) -> &[u32; 12] {
        &self.counts
    }

    /// Sum of all bins.
    pub fn total(&self) -> u32 {
        self.counts.iter().fold(0u32, |acc, &c| acc.saturating_add(c))
    }

    /// True when nothing has been counted.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Counts normalized to sum to 1, or all zeros when empty.
    pub fn distribution(&self) -> [f64; 12] {
        let total = f64::from(self.total());
        let mut dist = [0.0; 12];
        if total > 0.0 {
            for (d, &c) in dist.iter_mut().zip(&self.counts) {
                *d = f64::from(c) / total;
            }
        }
        dist
    }

    /// Add every bin of `other`.
    pub fn merge(&mut self, other: &Self) {
        for (note, n) in other.iter() {
            self.add(note, n);
        }
    }

    /// `(note, count)` pairs, C first.
    pub fn iter(&self) -> impl Iterator<Item = (Note, u32)> + '_ {
        Note::ALL.iter().map(|&n| (n, self.count(n)))
    }

    /// Most frequent pitch class, lowest semitone on ties. `None` when empty.
    pub fn peak(&self) -> Option<Note> {
        let mut best: Option<(Note, u32)> = None;
        for (note, n) in self.iter() {
            if n > 0 && best.is_none_or(|(_, b)| n > b) {
                best = Some((note, n));
            }
        }
        best.map(|(note, _)| note)
    }
}
