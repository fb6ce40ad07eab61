//! Receiver session ("zorg"): listen, decode items, materialize files
//!
//! One connection at a time. Each accepted connection is a loop over header
//! frames: decode, decide accept/deny, reply, then read exactly the body
//! bytes into the target file. Directory markers carry no body and are
//! acknowledged immediately. The end sentinel closes the session; `-q`
//! decides whether the process exits or the listener resumes.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::PathBuf;

use crate::codec::FrameHeader;
use crate::log::{ItemStatus, TransferLog, TransferLogEntry};
use crate::net;
use crate::paths;
use crate::protocol::{reply, DIR_TAG};

#[derive(Debug, Clone)]
pub struct ZorgConfig {
    /// Bind address; `None` auto-picks the first private interface address.
    pub bind: Option<Ipv4Addr>,
    pub port: u16,
    pub always_accept: bool,
    pub quit_after: bool,
    /// Received items are materialized under this existing directory.
    pub save_root: PathBuf,
    pub log_file: Option<PathBuf>,
}

/// Operator decision callback: item display name and size in bytes.
pub type PromptFn = Box<dyn FnMut(&str, i64) -> bool + Send>;

enum ConnectionEnd {
    /// Peer sent the end sentinel.
    Farewell,
    /// Peer closed the socket at a frame boundary (e.g. after a deny).
    PeerLeft,
}

pub struct ZorgSession {
    config: ZorgConfig,
    prompt: PromptFn,
    log: Option<TransferLog>,
}

impl ZorgSession {
    pub fn new(config: ZorgConfig) -> Self {
        let log = config.log_file.as_ref().map(TransferLog::new);
        ZorgSession {
            config,
            prompt: Box::new(console_prompt),
            log,
        }
    }

    /// Replace the console prompt, e.g. for tests.
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn run(&mut self) -> Result<()> {
        let ip = match self.config.bind {
            Some(ip) => ip,
            None => net::pick_local_ipv4()
                .ok_or_else(|| anyhow!("ERROR: No valid IP address could be found!"))?,
        };
        if !self.config.save_root.is_dir() {
            bail!(
                "ERROR: Directory {} does not exist!",
                self.config.save_root.display()
            );
        }
        let listener = TcpListener::bind((ip, self.config.port)).map_err(|_| {
            anyhow!(
                "ERROR: Port {} is already being used in this host!",
                self.config.port
            )
        })?;
        println!("Start zorging on {}:{}...", ip, self.config.port);

        loop {
            let (stream, _peer) = listener.accept().context("accepting connection")?;
            println!("\nConnected, preparing to receive files!");
            net::tune_socket(&stream);
            match self.serve(stream)? {
                ConnectionEnd::Farewell if self.config.quit_after => return Ok(()),
                ConnectionEnd::Farewell | ConnectionEnd::PeerLeft => {}
            }
        }
    }

    fn serve(&mut self, mut stream: TcpStream) -> Result<ConnectionEnd> {
        let mut ask_for_accept = true;
        let mut master_dir: Option<String> = None;

        loop {
            let header = match FrameHeader::read_from(&mut stream)? {
                Some(header) => header,
                None => return Ok(ConnectionEnd::PeerLeft),
            };
            if header.is_end() {
                println!("\nGorg has finished. Goodbye!");
                return Ok(ConnectionEnd::Farewell);
            }

            let (raw_path, receiving_dir) = match header.path.strip_prefix(DIR_TAG) {
                Some(rest) => (rest.to_owned(), true),
                None => (header.path.clone(), false),
            };
            let (parent, basename) = paths::split_path(&raw_path);
            let create_master_dir = receiving_dir && basename == ".";

            // Ask once per top-level walk: single items and walk roots
            // re-arm the prompt, accepted walk members disarm it
            if header.single_transfer || create_master_dir {
                ask_for_accept = true;
            }
            if !self.config.always_accept && ask_for_accept {
                let display = if create_master_dir { parent } else { raw_path.as_str() };
                if !(self.prompt)(display, header.body_len()) {
                    stream.write_all(reply::KO_SEND).context("sending deny")?;
                    self.log_item(display, 0, ItemStatus::Rejected);
                    continue;
                }
            }
            if !header.single_transfer {
                ask_for_accept = false;
            }

            let mut logical = paths::sanitize(&raw_path);
            if logical.is_empty() && !receiving_dir {
                println!("ERROR: Refusing item with empty path");
                stream.write_all(reply::KO_SEND).context("sending deny")?;
                continue;
            }
            if let Some(master) = &master_dir {
                if !create_master_dir && !logical.starts_with(master.as_str()) {
                    logical = format!("{master}/{logical}");
                }
            }

            if receiving_dir {
                stream.write_all(reply::OK_SEND).context("sending accept")?;
                let target = self.config.save_root.join(&logical);
                fs::create_dir_all(&target)
                    .with_context(|| format!("creating directory {}", target.display()))?;
                if create_master_dir {
                    master_dir = Some(paths::sanitize(parent));
                }
                stream.write_all(reply::OK).context("acknowledging directory")?;
                continue;
            }

            println!("\nZorging {basename}");
            stream.write_all(reply::OK_SEND).context("sending accept")?;

            let target = self.config.save_root.join(&logical);
            if let Some(parent_dir) = target.parent() {
                if !parent_dir.as_os_str().is_empty() {
                    fs::create_dir_all(parent_dir)
                        .with_context(|| format!("creating directory {}", parent_dir.display()))?;
                }
            }
            let mut out = File::create(&target)
                .with_context(|| format!("creating {}", target.display()))?;

            let total_size = header.body_len();
            if let Err(err) = receive_body(&mut stream, &mut out, total_size as u64) {
                self.log_item_failed(&logical, &err);
                return Err(err);
            }

            println!("Zorging completed");
            println!("File saved in {}", target.display());
            stream.write_all(reply::OK).context("acknowledging file")?;
            self.log_item(&logical, total_size, ItemStatus::Completed);
        }
    }

    fn log_item(&self, path: &str, bytes: i64, status: ItemStatus) {
        if let Some(log) = &self.log {
            let _ = log.add_entry(TransferLogEntry::new("zorg", path, bytes, status));
        }
    }

    fn log_item_failed(&self, path: &str, err: &anyhow::Error) {
        if let Some(log) = &self.log {
            let _ = log.add_entry(
                TransferLogEntry::new("zorg", path, 0, ItemStatus::Failed)
                    .with_error(format!("{err:#}")),
            );
        }
    }
}

/// Read exactly `remaining` body bytes into the open destination file.
fn receive_body(stream: &mut TcpStream, out: &mut File, mut remaining: u64) -> Result<()> {
    let mut buf = vec![0u8; 64 * 1024];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = stream.read(&mut buf[..want]).context("reading file body")?;
        if n == 0 {
            bail!("peer closed the connection mid-stream");
        }
        out.write_all(&buf[..n]).context("writing file body")?;
        remaining -= n as u64;
    }
    Ok(())
}

fn console_prompt(name: &str, size: i64) -> bool {
    print!(
        "\nDo you want to zorg \"{}\" with {}? (y/N) ",
        name,
        paths::human_size(size)
    );
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y")
}
