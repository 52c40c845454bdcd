//! bluesgrid CLI - play, render and analyze with the blues grid synth.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bluesgrid")]
#[command(author, version, about = "Blues grid synth and key detector", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the key of an audio file
    Detect(commands::detect::DetectArgs),

    /// Play the blues scale of a key on the audio device
    Play(commands::play::PlayArgs),

    /// Render the blues scale of a key to a WAV file
    Render(commands::render::RenderArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Print the blues-scale grid of a key
    Scale(commands::scale::ScaleArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect(args) => commands::detect::run(args, &config),
        Commands::Play(args) => commands::play::run(args, &config),
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Scale(args) => commands::scale::run(args),
    }
}
