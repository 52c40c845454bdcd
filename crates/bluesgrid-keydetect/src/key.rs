//! Notes, modes and musical keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseKeyError;

/// One of the twelve chromatic pitch classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Note {
    /// C
    C,
    /// C♯ / D♭
    CSharp,
    /// D
    D,
    /// D♯ / E♭
    DSharp,
    /// E
    E,
    /// F
    F,
    /// F♯ / G♭
    FSharp,
    /// G
    G,
    /// G♯ / A♭
    GSharp,
    /// A
    A,
    /// A♯ / B♭
    ASharp,
    /// B
    B,
}

impl Note {
    /// All pitch classes, semitone ascending from C.
    pub const ALL: [Self; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    /// Semitones above C (0..12).
    pub const fn semitone(self) -> u8 {
        self as u8
    }

    /// Pitch class for any semitone count, wrapping in both directions.
    pub fn from_semitone(semitone: i32) -> Self {
        Self::ALL[semitone.rem_euclid(12) as usize]
    }

    /// Sharp-spelled name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::CSharp => "C#",
            Self::D => "D",
            Self::DSharp => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::FSharp => "F#",
            Self::G => "G",
            Self::GSharp => "G#",
            Self::A => "A",
            Self::ASharp => "A#",
            Self::B => "B",
        }
    }

    /// Transpose by `semitones`.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_semitone(self.semitone() as i32 + semitones)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = ParseKeyError;

    /// Accepts sharps and flats in ASCII (`#`, `b`) or Unicode (`♯`, `♭`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .replace('♯', "#")
            .replace('♭', "b")
            .to_ascii_uppercase();
        let note = match normalized.as_str() {
            "C" => Self::C,
            "C#" | "DB" => Self::CSharp,
            "D" => Self::D,
            "D#" | "EB" => Self::DSharp,
            "E" => Self::E,
            "F" => Self::F,
            "F#" | "GB" => Self::FSharp,
            "G" => Self::G,
            "G#" | "AB" => Self::GSharp,
            "A" => Self::A,
            "A#" | "BB" => Self::ASharp,
            "B" => Self::B,
            _ => return Err(ParseKeyError::Note(s.trim().to_string())),
        };
        Ok(note)
    }
}

/// Major or minor mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleType {
    /// Major (Ionian).
    Major,
    /// Natural minor (Aeolian).
    Minor,
}

impl ScaleType {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleType {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" | "maggiore" => Ok(Self::Major),
            "minor" | "min" | "minore" => Ok(Self::Minor),
            _ => Err(ParseKeyError::Mode(s.trim().to_string())),
        }
    }
}

/// A root note plus mode, e.g. "E Minor".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MusicalKey {
    /// Tonic.
    pub root: Note,
    /// Mode.
    pub scale: ScaleType,
}

impl MusicalKey {
    /// Key reported when detection is inconclusive.
    pub const DEFAULT_DETECTION: Self = Self::new(Note::A, ScaleType::Minor);

    /// Create a key.
    pub const fn new(root: Note, scale: ScaleType) -> Self {
        Self { root, scale }
    }

    /// Same root, minor mode.
    ///
    /// The classifier always reports the best-fitting mode; callers that
    /// want a blues feel regardless apply this themselves.
    pub const fn to_minor(self) -> Self {
        Self::new(self.root, ScaleType::Minor)
    }
}

impl Default for MusicalKey {
    fn default() -> Self {
        Self::new(Note::C, ScaleType::Minor)
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.scale)
    }
}

impl FromStr for MusicalKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(root), Some(mode), None) => Ok(Self::new(root.parse()?, mode.parse()?)),
            _ => Err(ParseKeyError::Format(s.to_string())),
        }
    }
}
