use anyhow::Result;
use clap::Parser;

use gorgzorg::cli::{self, Args, Mode};
use gorgzorg::gorg;
use gorgzorg::zorg::ZorgSession;

fn main() -> Result<()> {
    let args = Args::parse();
    match cli::parse_mode(&args)? {
        // Cancellation is a clean exit; only real errors reach the caller
        Mode::Gorg(config) => gorg::run(&config).map(|_| ()),
        Mode::Zorg(config) => ZorgSession::new(config).run(),
    }
}
