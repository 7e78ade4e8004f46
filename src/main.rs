//! lcd6502-rom - generate the LCD hello ROM

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use lcd6502_rom::config::DEFAULT_MESSAGE;
use lcd6502_rom::{disasm, DelayCounts, RomConfig};

#[derive(Parser, Debug)]
#[command(name = "lcd6502-rom", version)]
#[command(about = "Generate a 32KB 6502 ROM that prints a message on an HD44780 LCD")]
struct Args {
    /// Output binary file
    #[arg(short, long, default_value = "rom.bin")]
    output: PathBuf,

    /// Message to print (at most 255 bytes)
    #[arg(short, long, default_value = DEFAULT_MESSAGE)]
    message: String,

    /// wait_short loop count
    #[arg(long, default_value_t = 255)]
    short_wait: u32,

    /// wait_long outer loop count
    #[arg(long, default_value_t = 255)]
    long_wait_outer: u32,

    /// wait_long inner loop count
    #[arg(long, default_value_t = 255)]
    long_wait_inner: u32,

    /// Print a disassembly of the generated code
    #[arg(long)]
    listing: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let delays = DelayCounts::new(args.short_wait, args.long_wait_outer, args.long_wait_inner)
        .context("invalid delay count")?;
    let config = RomConfig::new(args.message.into_bytes(), delays);

    let rom = lcd6502_rom::generate(&config).context("failed to generate ROM")?;

    if args.listing {
        print!("{}", disasm::listing(&rom));
    }

    rom.write_to(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    for region in rom.regions() {
        info!("  {} ({} bytes)", region, region.len());
    }

    Ok(())
}
