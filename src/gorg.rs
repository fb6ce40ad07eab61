//! Sender session ("gorg"): one connect-send-close cycle
//!
//! The sender resolves its source into an ordered item list, opens a single
//! TCP connection and drives the framing protocol: for every item it writes
//! a header frame, waits for the receiver's accept/deny, streams the body in
//! fixed-size chunks, waits for the completion acknowledgement, then moves
//! on. After the last item it writes the end sentinel without waiting.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::{self, ArchiveKind};
use crate::codec::{FrameHeader, Reply, ReplyStream};
use crate::fs_enum::{self, Item};
use crate::log::{ItemStatus, TransferLog, TransferLogEntry};
use crate::net;
use crate::progress::{self, SessionStats};
use crate::protocol::{timeouts, DIR_TAG};

#[derive(Debug, Clone)]
pub struct GorgConfig {
    pub target: Ipv4Addr,
    pub port: u16,
    pub source: String,
    pub archive: Option<ArchiveKind>,
    pub verbose: bool,
    pub chunk_kib: u64,
    pub log_file: Option<PathBuf>,
}

/// How the session ended. Cancellation is a normal outcome, not an error:
/// the process exits 0 after the receiver denies an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

pub fn run(config: &GorgConfig) -> Result<Outcome> {
    let mut archive_path: Option<PathBuf> = None;
    let source = match config.archive {
        Some(kind) => {
            let (real_path, filter) = fs_enum::split_glob(&config.source);
            let produced = archive::create_archive(kind, &real_path, filter.as_deref())?;
            let logical = produced.to_string_lossy().into_owned();
            archive_path = Some(produced);
            logical
        }
        None => config.source.clone(),
    };

    // The temp artifact must go away on every exit path
    let result = send_session(config, &source);
    if let Some(produced) = archive_path {
        let _ = std::fs::remove_file(&produced);
    }
    result
}

fn build_items(source: &str) -> Result<(Vec<Item>, bool)> {
    let path = Path::new(source);
    if path.is_file() {
        let size = path
            .metadata()
            .with_context(|| format!("reading metadata of {source}"))?
            .len();
        let logical = source.replace('\\', "/");
        return Ok((vec![Item::File { logical, size }], true));
    }

    let (real_path, filter) = fs_enum::split_glob(source);
    if !Path::new(&real_path).is_dir() {
        bail!("ERROR: {source} could not be found!");
    }
    let items = fs_enum::enumerate_tree(&real_path, filter.as_deref())?;
    Ok((items, false))
}

fn send_session(config: &GorgConfig, source: &str) -> Result<Outcome> {
    let (items, single_transfer) = build_items(source)?;
    let log = config.log_file.as_ref().map(TransferLog::new);

    let addr = SocketAddr::from((config.target, config.port));
    let stream = TcpStream::connect_timeout(&addr, Duration::from_millis(timeouts::CONNECT_MS))
        .map_err(|_| {
            anyhow!(
                "ERROR: There seems to be no one zorging on {}:{}!",
                config.target,
                config.port
            )
        })?;
    net::tune_socket(&stream);
    let mut replies = ReplyStream::new(stream.try_clone().context("cloning socket")?);
    let mut writer = &stream;

    let chunk_len = (config.chunk_kib.max(1) * 1024) as usize;
    let mut chunk = vec![0u8; chunk_len];
    let mut stats = SessionStats::new();

    for item in &items {
        match item {
            Item::Dir { logical } => {
                let header = FrameHeader::new(format!("{DIR_TAG}{logical}"), 0, single_transfer);
                writer.write_all(&header.encode()).context("announcing directory")?;
                if replies.next_accept()? == Reply::KoSend {
                    report_cancelled(log.as_ref(), logical);
                    return Ok(Outcome::Cancelled);
                }
                replies.next_ok()?;
            }
            Item::File { logical, size } => {
                let mut file = match File::open(logical) {
                    Ok(file) => file,
                    Err(_) => {
                        println!("ERROR: {logical} could not be opened");
                        continue;
                    }
                };
                println!("\nGorging {logical}");

                let header = FrameHeader::new(logical.clone(), *size as i64, single_transfer);
                writer.write_all(&header.encode()).context("announcing file")?;
                if replies.next_accept()? == Reply::KoSend {
                    report_cancelled(log.as_ref(), logical);
                    return Ok(Outcome::Cancelled);
                }

                let bar = config.verbose.then(|| progress::file_bar(*size, logical));
                let mut sent = 0u64;
                loop {
                    // Never send past the announced size, even if the file grew
                    let want = chunk.len().min((size - sent) as usize);
                    if want == 0 {
                        break;
                    }
                    let n = file
                        .read(&mut chunk[..want])
                        .with_context(|| format!("reading {logical}"))?;
                    if n == 0 {
                        break;
                    }
                    writer
                        .write_all(&chunk[..n])
                        .context("peer closed the connection mid-stream")?;
                    sent += n as u64;
                    if let Some(bar) = &bar {
                        bar.set_position(sent);
                    }
                }
                if let Some(bar) = bar {
                    bar.finish_and_clear();
                }
                if sent != *size {
                    bail!("{logical} changed while gorging: sent {sent} of {size} bytes");
                }

                replies.next_ok()?;
                println!("Gorging completed");
                stats.add_file(sent);
                if let Some(log) = &log {
                    let _ = log.add_entry(TransferLogEntry::new(
                        "gorg",
                        logical,
                        sent as i64,
                        ItemStatus::Completed,
                    ));
                }
            }
        }
    }

    // End sentinel; no reply expected
    writer.write_all(&FrameHeader::end().encode()).context("sending end of transfer")?;
    println!("\nGorging goodbye!");
    if config.verbose {
        println!("{}", stats.summary());
    }
    Ok(Outcome::Completed)
}

fn report_cancelled(log: Option<&TransferLog>, logical: &str) {
    println!("\nZorg did not accept the transfer. Gorging cancelled!");
    if let Some(log) = log {
        let _ = log.add_entry(TransferLogEntry::new(
            "gorg",
            logical,
            0,
            ItemStatus::Rejected,
        ));
    }
}
