mod cli;

use crate::cli::app::App;
use crate::cli::args::Cli;
use anyhow::{Context, Result};
use clap::Parser;
use healthtrack::{HealthSession, RecordStore, StoreConfig};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = StoreConfig::from_env().context("Invalid HEALTHTRACK_* environment")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(file) = &cli.file {
        config = config.file_name(file);
    }
    if let Some(ms) = cli.lock_timeout_ms {
        config = config.lock_timeout(Duration::from_millis(ms));
    }

    let store = RecordStore::open(config)?;
    let mut app = App::new(HealthSession::open(store));
    for warning in app.load_warnings() {
        eprintln!("warning: {}", warning);
    }

    let mut stdout = std::io::stdout().lock();
    app.run(cli.command, &mut stdout)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    // Load warnings are printed by main itself, so the default filter stays at error.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}
