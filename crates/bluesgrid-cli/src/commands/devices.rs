//! List audio output devices.

use bluesgrid_io::list_output_devices;
use clap::Args;

#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Print only device names, one per line
    #[arg(long)]
    pub names: bool,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let devices = list_output_devices()?;

    if args.names {
        for device in &devices {
            println!("{}", device.name);
        }
        return Ok(());
    }

    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    println!("Output Devices:");
    for (idx, device) in devices.iter().enumerate() {
        let default = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} Hz){}",
            idx, device.name, device.default_sample_rate, default
        );
    }
    println!();
    println!("Tip: pass a partial name with --device, or set audio.device in the config file.");
    Ok(())
}
