//! CLI surface and validated mode configuration

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::archive::ArchiveKind;
use crate::gorg::GorgConfig;
use crate::net;
use crate::protocol;
use crate::zorg::ZorgConfig;

#[derive(Parser, Debug)]
#[command(
    name = "gorgzorg",
    version = protocol::VERSION,
    about = "A simple point to point network file transfer tool",
    after_help = "Examples:\n  \
        # Send contents of Test directory to IP 192.168.0.1\n  \
        gorgzorg -c 192.168.0.1 -g Test\n\n  \
        # Start listening on port 20000 with address 192.168.10.16\n  \
        gorgzorg -p 20000 -z 192.168.10.16"
)]
pub struct Args {
    /// IP address to connect to (gorg mode)
    #[arg(short = 'c', value_name = "IP")]
    pub connect: Option<String>,

    /// Listen for connections (zorg mode); guesses a private IP when omitted
    #[arg(short = 'z', value_name = "IP", num_args = 0..=1, default_missing_value = "")]
    pub zorg: Option<String>,

    /// Relative file, directory or glob to gorg (send)
    #[arg(short = 'g', value_name = "PATH")]
    pub gorg: Option<String>,

    /// Port to connect or listen to
    #[arg(
        short = 'p',
        value_name = "PORT",
        default_value_t = protocol::DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Directory where received files are saved (zorg mode)
    #[arg(short = 'd', value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Archive the path with tar before sending
    #[arg(long)]
    pub tar: bool,

    /// Archive and compress the path with tar and gzip before sending
    #[arg(long)]
    pub zip: bool,

    /// Accept every transfer without asking (zorg mode)
    #[arg(short = 'y')]
    pub always_accept: bool,

    /// Quit after one completed transfer session (zorg mode)
    #[arg(short = 'q')]
    pub quit_after: bool,

    /// Verbose output with progress and statistics
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Send chunk size in KiB
    #[arg(long = "bs", value_name = "KIB", default_value_t = protocol::DEFAULT_CHUNK_KIB)]
    pub block_size: u64,

    /// Append machine readable transfer records to this JSONL file
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Mode {
    Gorg(GorgConfig),
    Zorg(ZorgConfig),
}

/// Validate the flag combination into one of the two exclusive roles.
pub fn parse_mode(args: &Args) -> Result<Mode> {
    match (&args.connect, &args.zorg) {
        (Some(_), Some(_)) => bail!("ERROR: -c and -z cannot be combined"),
        (None, None) => bail!("ERROR: Either -c <IP> (gorg) or -z (zorg) must be given"),
        (Some(target), None) => {
            if !net::is_local_ipv4(target) {
                bail!("ERROR: GorgZorg can only be run in a local network!");
            }
            let source = args
                .gorg
                .clone()
                .context("ERROR: A path to gorg is needed (use -g)")?;
            if source.starts_with('/') {
                bail!("ERROR: GorgZorg only works with relative files or paths!");
            }
            if args.tar && args.zip {
                bail!("ERROR: --tar and --zip cannot be combined");
            }
            let archive = if args.zip {
                Some(ArchiveKind::TarGz)
            } else if args.tar {
                Some(ArchiveKind::Tar)
            } else {
                None
            };
            Ok(Mode::Gorg(GorgConfig {
                target: target.parse().context("parsing target address")?,
                port: args.port,
                source,
                archive,
                verbose: args.verbose,
                chunk_kib: args.block_size,
                log_file: args.log.clone(),
            }))
        }
        (None, Some(bind)) => {
            let bind = if bind.is_empty() {
                None
            } else {
                if !net::is_local_ipv4(bind) {
                    bail!("ERROR: GorgZorg can only be run in a local network!");
                }
                Some(bind.parse().context("parsing bind address")?)
            };
            let save_root = match &args.directory {
                Some(dir) => {
                    if !dir.is_dir() {
                        bail!("ERROR: Directory {} does not exist!", dir.display());
                    }
                    dir.clone()
                }
                None => PathBuf::from("."),
            };
            Ok(Mode::Zorg(ZorgConfig {
                bind,
                port: args.port,
                always_accept: args.always_accept,
                quit_after: args.quit_after,
                save_root,
                log_file: args.log.clone(),
            }))
        }
    }
}
