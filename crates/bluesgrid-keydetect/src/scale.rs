//! Blues scales laid out on the playing grid.
//!
//! Minor blues is root, ♭3, 4, ♭5, 5, ♭7 with the ♭5 as blue note; major
//! blues is root, 2, ♭3, 3, 5, 6 with the ♭3 as blue note. Grid rows climb
//! through the intervals and move up an octave after each full cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{MusicalKey, Note, ScaleType};

/// Minor blues intervals in semitones.
pub const MINOR_BLUES: [i32; 6] = [0, 3, 5, 6, 7, 10];

/// Major blues intervals in semitones.
pub const MAJOR_BLUES: [i32; 6] = [0, 2, 3, 4, 7, 9];

/// Default bottom octave of the grid.
pub const DEFAULT_BASE_OCTAVE: i32 = 3;

/// Blues intervals for a mode.
pub fn blues_intervals(scale: ScaleType) -> &'static [i32; 6] {
    match scale {
        ScaleType::Major => &MAJOR_BLUES,
        ScaleType::Minor => &MINOR_BLUES,
    }
}

/// Interval of the blue note for a mode.
pub fn blue_note_interval(scale: ScaleType) -> i32 {
    match scale {
        ScaleType::Major => 3,
        ScaleType::Minor => 6,
    }
}

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
pub fn midi_to_frequency(midi: i32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69) as f32 / 12.0)
}

/// MIDI number of `note` in `octave` (C4 = 60).
pub fn note_to_midi(note: Note, octave: i32) -> i32 {
    (octave + 1) * 12 + note.semitone() as i32
}

/// One grid row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    /// Pitch class.
    pub note: Note,
    /// Octave number (C4 = middle C).
    pub octave: i32,
    /// Frequency in Hz.
    pub frequency: f32,
    /// MIDI note number.
    pub midi: i32,
    /// 1-based position in the scale.
    pub degree: usize,
    /// True for the scale's blue note.
    pub is_blue_note: bool,
}

impl fmt::Display for NoteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note, self.octave)
    }
}

/// `rows` notes of the blues scale of `key`, lowest first, starting at the
/// root in `base_octave`.
pub fn grid_notes(key: MusicalKey, rows: usize, base_octave: i32) -> Vec<NoteInfo> {
    let intervals = blues_intervals(key.scale);
    let blue = blue_note_interval(key.scale);
    let root = key.root.semitone() as i32;

    (0..rows)
        .map(|row| {
            let degree = row % intervals.len();
            let octave = base_octave + (row / intervals.len()) as i32;
            let interval = intervals[degree];
            let midi = (octave + 1) * 12 + root + interval;
            NoteInfo {
                note: Note::from_semitone(root + interval),
                octave: midi.div_euclid(12) - 1,
                frequency: midi_to_frequency(midi),
                midi,
                degree: degree + 1,
                is_blue_note: interval == blue,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minor_blues_first_octave() {
        let key = MusicalKey::new(Note::A, ScaleType::Minor);
        let notes = grid_notes(key, 7, 3);
        let names: Vec<String> = notes.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["A3", "C4", "D4", "D#4", "E4", "G4", "A4"]);
        assert_eq!(notes[0].midi, 57);
        assert!((notes[6].frequency - 440.0).abs() < 1e-3);
        assert!(notes[3].is_blue_note);
        assert_eq!(notes.iter().filter(|n| n.is_blue_note).count(), 1);
        assert_eq!(notes[6].degree, 1);
    }

    #[test]
    fn c_major_blues_blue_note_is_flat_third() {
        let key = MusicalKey::new(Note::C, ScaleType::Major);
        let notes = grid_notes(key, 6, 4);
        assert_eq!(notes[0].midi, 60);
        assert_eq!(notes[2].note, Note::DSharp);
        assert!(notes[2].is_blue_note);
        assert!(!notes[3].is_blue_note);
    }

    #[test]
    fn rows_ascend() {
        let key = MusicalKey::new(Note::FSharp, ScaleType::Minor);
        let notes = grid_notes(key, 18, DEFAULT_BASE_OCTAVE);
        assert_eq!(notes.len(), 18);
        for pair in notes.windows(2) {
            assert!(pair[1].midi > pair[0].midi);
            assert!(pair[1].frequency > pair[0].frequency);
        }
    }

    #[test]
    fn midi_helpers() {
        assert_eq!(note_to_midi(Note::C, 4), 60);
        assert!((midi_to_frequency(69) - 440.0).abs() < 1e-4);
        assert!((midi_to_frequency(57) - 220.0).abs() < 1e-3);
    }
}
