//! flashfat - sequential file store on a NOR flash image
//!
//! Drives the flashfat store against a chip image held in an ordinary file,
//! through the same emulated device used for testing. The image is loaded
//! before the command runs and written back afterwards, so a directory of
//! images stands in for a drawer of flash chips.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use flashfat_core::store::FlashStore;
use flashfat_core::Error as StoreError;
use flashfat_dummy::{DummyConfig, DummyFlash};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = DummyConfig {
        size: cli.size,
        ..DummyConfig::default()
    };
    let device = DummyFlash::load(&cli.image, config)?;
    let mut store = FlashStore::new(device);

    match store.init(0) {
        Ok(()) => {}
        Err(StoreError::TableNotFound) => {
            if !matches!(cli.command, Commands::Format) {
                eprintln!(
                    "no allocation table on {}; run `flashfat format` first",
                    cli.image.display()
                );
                std::process::exit(1);
            }
        }
        Err(e) => return Err(e.into()),
    }

    match cli.command {
        Commands::Format => commands::format::run(&mut store)?,
        Commands::Ls => commands::list::run(&store)?,
        Commands::Store { input } => commands::store::run(&mut store, &input)?,
        Commands::Cat { index, output } => commands::cat::run(&mut store, index, &output)?,
        Commands::RmLast => commands::delete::run_last(&mut store)?,
        Commands::RmAll => commands::delete::run_all(&mut store)?,
    }

    store.into_device().save(&cli.image)?;
    Ok(())
}
