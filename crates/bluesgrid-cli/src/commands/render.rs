//! Render a blues-scale phrase to a WAV file without an audio device.

use std::path::PathBuf;

use bluesgrid_config::AppConfig;
use bluesgrid_io::{OfflineRenderer, WavSpec, write_wav};
use bluesgrid_synth::Command;
use clap::Args;

use super::common::{PhraseArgs, scale_phrase};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output WAV file
    pub output: PathBuf,

    #[command(flatten)]
    pub phrase: PhraseArgs,

    /// Output bit depth (16, 24 or 32 float)
    #[arg(long, default_value = "16")]
    pub bits: u16,
}

pub fn run(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    if !matches!(args.bits, 16 | 24 | 32) {
        anyhow::bail!("unsupported bit depth {} (use 16, 24 or 32)", args.bits);
    }
    let sample_rate = config.audio.sample_rate;
    let channels = config.audio.channels;

    let mut renderer = OfflineRenderer::new(sample_rate, channels);
    for command in config.initial_commands() {
        renderer.apply(command);
    }
    if let Some(wave) = args.phrase.wave {
        renderer.apply(Command::SetWaveType(wave));
    }

    let phrase = scale_phrase(&args.phrase);
    tracing::info!(
        key = %args.phrase.key,
        notes = phrase.events.len(),
        secs = phrase.duration_secs,
        "rendering phrase"
    );
    let samples = renderer.render_script(&phrase.events, phrase.duration_secs);

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: args.bits,
    };
    write_wav(&args.output, &samples, spec)?;

    println!(
        "Rendered {:.2}s of {} to {}",
        phrase.duration_secs,
        args.phrase.key,
        args.output.display()
    );
    Ok(())
}
