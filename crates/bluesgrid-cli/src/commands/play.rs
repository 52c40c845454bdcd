//! Play a blues-scale phrase through the audio device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use bluesgrid_config::AppConfig;
use bluesgrid_io::{AudioEngine, CpalBackend};
use clap::Args;

use super::common::{PhraseArgs, scale_phrase};

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub phrase: PhraseArgs,

    /// Output device (partial name match)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Repeat until interrupted
    #[arg(long)]
    pub r#loop: bool,
}

const POLL: Duration = Duration::from_millis(5);

pub fn run(args: PlayArgs, config: &AppConfig) -> anyhow::Result<()> {
    let mut stream_config = config.stream_config();
    if args.device.is_some() {
        stream_config.device_name = args.device.clone();
    }

    let mut engine = AudioEngine::new(CpalBackend::new(), stream_config);
    engine.try_create().context("opening audio output")?;
    config.apply_to_engine(&mut engine);
    if let Some(wave) = args.phrase.wave {
        engine.set_wave_type(wave);
    }
    engine.try_start().context("starting audio stream")?;

    let phrase = scale_phrase(&args.phrase);
    let mut events = phrase.events;
    events.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));

    println!(
        "Playing {} at {} Hz{}... Press Ctrl+C to stop.",
        args.phrase.key,
        engine.sample_rate(),
        if args.r#loop { " (looping)" } else { "" }
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    'outer: loop {
        let start = Instant::now();
        for event in &events {
            let due = start + Duration::from_secs_f32(event.at_secs.max(0.0));
            while Instant::now() < due {
                if !running.load(Ordering::SeqCst) {
                    break 'outer;
                }
                thread::sleep(POLL.min(due.saturating_duration_since(Instant::now())));
            }
            if !engine.is_running() {
                anyhow::bail!("audio device lost during playback");
            }
            engine.apply(event.command);
        }

        let end = start + Duration::from_secs_f32(phrase.duration_secs);
        while Instant::now() < end {
            if !running.load(Ordering::SeqCst) {
                break 'outer;
            }
            thread::sleep(POLL);
        }
        if !args.r#loop {
            break;
        }
    }

    engine.all_notes_off();
    // One callback period for the fade.
    thread::sleep(Duration::from_millis(50));
    let dropped = engine.dropped_commands();
    if dropped > 0 {
        tracing::warn!(dropped, "commands dropped during playback");
    }
    engine.destroy();
    println!("Done!");
    Ok(())
}
