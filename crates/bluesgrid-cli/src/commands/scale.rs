//! Print the blues grid for a key.

use bluesgrid_keydetect::{DEFAULT_BASE_OCTAVE, MusicalKey, NoteInfo, grid_notes};
use clap::Args;

#[derive(Args, Debug)]
pub struct ScaleArgs {
    /// Key, e.g. "A minor"
    pub key: MusicalKey,

    /// Number of grid rows
    #[arg(long, default_value = "12")]
    pub rows: usize,

    /// Octave of the lowest row
    #[arg(long, default_value_t = DEFAULT_BASE_OCTAVE)]
    pub octave: i32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ScaleArgs) -> anyhow::Result<()> {
    let notes: Vec<NoteInfo> = grid_notes(args.key, args.rows, args.octave);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }

    println!("{} blues grid", args.key);
    println!("{:>4}  {:<5} {:>6} {:>10}", "row", "note", "midi", "freq (Hz)");
    // Highest row on top, as on the touch grid.
    for (row, note) in notes.iter().enumerate().rev() {
        let blue = if note.is_blue_note { "  blue" } else { "" };
        println!(
            "{:>4}  {:<5} {:>6} {:>10.2}{}",
            row + 1,
            note.to_string(),
            note.midi,
            note.frequency,
            blue
        );
    }
    Ok(())
}
