//! Detect the key of an audio file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bluesgrid_config::AppConfig;
use bluesgrid_io::FileSource;
use bluesgrid_keydetect::{
    DEFAULT_BASE_OCTAVE, DetectionOutcome, DetectionStage, KeyDetectionResult, KeyDetector,
    MusicalKey, Note, NoteInfo, grid_notes,
};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Audio file (wav, mp3, aac/m4a, flac, ogg)
    pub input: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Report the minor key on the detected root
    #[arg(long)]
    pub blues: bool,

    /// Deadline in seconds (overrides detection.timeout_secs)
    #[arg(long)]
    pub timeout: Option<f32>,

    /// Also print this many grid rows for the detected key
    #[arg(long)]
    pub grid: Option<usize>,
}

#[derive(Serialize)]
struct DetectReport {
    file: String,
    key: String,
    root: Note,
    scale: String,
    confidence: f32,
    outcome: DetectionOutcome,
    analyzed_secs: f32,
    /// Counts from C upward.
    histogram: [u32; 12],
    #[serde(skip_serializing_if = "Option::is_none")]
    grid: Option<Vec<NoteInfo>>,
}

const POLL: Duration = Duration::from_millis(20);

pub fn run(args: DetectArgs, config: &AppConfig) -> anyhow::Result<()> {
    let mut detection = config.detection_config();
    if let Some(secs) = args.timeout {
        detection.timeout = Duration::try_from_secs_f32(secs)
            .map_err(|e| anyhow::anyhow!("invalid --timeout {secs}: {e}"))?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    tracing::info!(file = %args.input.display(), timeout = ?detection.timeout, "detecting key");
    let mut handle = KeyDetector::new(detection).spawn(FileSource::new(&args.input));

    let mut last_stage = DetectionStage::Idle;
    let mut cancelled = false;
    while handle.try_result().is_none() {
        if !cancelled && interrupted.load(Ordering::SeqCst) {
            handle.cancel();
            cancelled = true;
        }
        let stage = handle.stage();
        if stage != last_stage {
            tracing::debug!(?stage, "detection stage");
            last_stage = stage;
        }
        thread::sleep(POLL);
    }
    let result = handle.wait();

    let key = if args.blues {
        result.key.to_minor()
    } else {
        result.key
    };
    let grid = args.grid.map(|rows| grid_notes(key, rows, DEFAULT_BASE_OCTAVE));

    if args.json {
        let report = report(&args, &result, key, grid);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&args, &result, key, grid.as_deref());
    }
    Ok(())
}

fn report(
    args: &DetectArgs,
    result: &KeyDetectionResult,
    key: MusicalKey,
    grid: Option<Vec<NoteInfo>>,
) -> DetectReport {
    DetectReport {
        file: args.input.display().to_string(),
        key: key.to_string(),
        root: key.root,
        scale: key.scale.to_string(),
        confidence: result.confidence,
        outcome: result.outcome,
        analyzed_secs: result.analyzed_secs,
        histogram: *result.histogram.counts(),
        grid,
    }
}

fn print_text(
    args: &DetectArgs,
    result: &KeyDetectionResult,
    key: MusicalKey,
    grid: Option<&[NoteInfo]>,
) {
    println!("File:       {}", args.input.display());
    println!("Key:        {key}");
    println!("Confidence: {:.1}%", result.confidence * 100.0);
    println!("Outcome:    {:?}", result.outcome);
    println!("Analyzed:   {:.1}s", result.analyzed_secs);

    if !result.histogram.is_empty() {
        println!();
        println!("Pitch classes:");
        let max = result.histogram.counts().iter().copied().max().unwrap_or(1).max(1);
        for (note, count) in result.histogram.iter() {
            let bar = "#".repeat((count as usize * 30).div_ceil(max as usize));
            println!("  {:<3} {:>5} {}", note.to_string(), count, bar);
        }
    }

    if let Some(grid) = grid {
        println!();
        println!("Grid:");
        for note in grid.iter().rev() {
            let blue = if note.is_blue_note { "  blue" } else { "" };
            println!("  {:<5} {:>8.2} Hz{}", note.to_string(), note.frequency, blue);
        }
    }
}
