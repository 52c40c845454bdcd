//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::Context;
use bluesgrid_config::{AppConfig, default_config_path};
use bluesgrid_io::ScheduledCommand;
use bluesgrid_keydetect::{DEFAULT_BASE_OCTAVE, MusicalKey, grid_notes};
use bluesgrid_synth::{Command, MAX_VOICES};
use clap::Args;

/// Load `--config`, or the default file if present.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(AppConfig::load_or_default(default_config_path())?),
    }
}

/// What to play: a run up and down the blues grid of a key.
#[derive(Args, Debug, Clone)]
pub struct PhraseArgs {
    /// Key, e.g. "A minor" or "Eb Major"
    #[arg(short, long, default_value = "C Minor")]
    pub key: MusicalKey,

    /// Instrument wave type (0 organ, 1 synth, 2 drums, 3 bass, 4 guitar,
    /// 5 square, 6 triangle, 7 sine); defaults to the configured one
    #[arg(short, long)]
    pub wave: Option<i32>,

    /// Grid rows to climb
    #[arg(long, default_value = "7")]
    pub rows: usize,

    /// Octave of the lowest row
    #[arg(long, default_value_t = DEFAULT_BASE_OCTAVE)]
    pub octave: i32,

    /// Length of each note in seconds
    #[arg(long, default_value = "0.35")]
    pub note_secs: f32,

    /// Bend each blue note up a semitone halfway through
    #[arg(long)]
    pub bend: bool,
}

/// A timed phrase and its total length including the release tail.
pub struct Phrase {
    pub events: Vec<ScheduledCommand>,
    pub duration_secs: f32,
}

const GATE: f32 = 0.85;
const TAIL_SECS: f32 = 0.6;

/// Up the grid and back down, one voice per note, cycling through the slots.
pub fn scale_phrase(args: &PhraseArgs) -> Phrase {
    let notes = grid_notes(args.key, args.rows.max(1), args.octave);
    let order: Vec<_> = notes
        .iter()
        .chain(notes.iter().rev().skip(1))
        .copied()
        .collect();
    let len = args.note_secs.max(0.05);

    let mut events = Vec::with_capacity(order.len() * 3);
    for (i, note) in order.iter().enumerate() {
        let voice = i % MAX_VOICES;
        let t = i as f32 * len;
        events.push(ScheduledCommand::new(
            t,
            Command::NoteOn {
                voice,
                frequency: note.frequency,
            },
        ));
        if args.bend && note.is_blue_note {
            events.push(ScheduledCommand::new(
                t + len * 0.5,
                Command::SetPitchBend {
                    voice,
                    semitones: 1.0,
                },
            ));
        }
        events.push(ScheduledCommand::new(t + len * GATE, Command::NoteOff { voice }));
    }

    Phrase {
        events,
        duration_secs: order.len() as f32 * len + TAIL_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluesgrid_keydetect::{Note, ScaleType};

    fn args() -> PhraseArgs {
        PhraseArgs {
            key: MusicalKey::new(Note::A, ScaleType::Minor),
            wave: None,
            rows: 7,
            octave: 3,
            note_secs: 0.5,
            bend: false,
        }
    }

    #[test]
    fn phrase_goes_up_and_down() {
        let phrase = scale_phrase(&args());
        let ons: Vec<f32> = phrase
            .events
            .iter()
            .filter_map(|e| match e.command {
                Command::NoteOn { frequency, .. } => Some(frequency),
                _ => None,
            })
            .collect();
        assert_eq!(ons.len(), 13);
        assert!((ons[6] - 440.0).abs() < 1e-3);
        assert_eq!(ons[0], ons[12]);
        assert!((phrase.duration_secs - (13.0 * 0.5 + TAIL_SECS)).abs() < 1e-5);
    }

    #[test]
    fn voices_cycle_through_all_slots() {
        let phrase = scale_phrase(&args());
        let voices: Vec<usize> = phrase
            .events
            .iter()
            .filter_map(|e| match e.command {
                Command::NoteOn { voice, .. } => Some(voice),
                _ => None,
            })
            .collect();
        assert_eq!(&voices[..9], &[0, 1, 2, 3, 4, 5, 6, 7, 0]);
    }

    #[test]
    fn bend_only_on_blue_notes() {
        let phrase = scale_phrase(&PhraseArgs {
            bend: true,
            ..args()
        });
        let bends = phrase
            .events
            .iter()
            .filter(|e| matches!(e.command, Command::SetPitchBend { .. }))
            .count();
        // D#4 on the way up and on the way down.
        assert_eq!(bends, 2);
    }
}
