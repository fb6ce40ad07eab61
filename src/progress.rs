//! Verbose-mode progress: a per-file bar and end-of-session statistics

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

pub fn file_bar(size: u64, name: &str) -> ProgressBar {
    let bar = ProgressBar::new(size);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(name.to_owned());
    bar
}

pub struct SessionStats {
    start: Instant,
    files: u64,
    bytes: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats {
            start: Instant::now(),
            files: 0,
            bytes: 0,
        }
    }

    pub fn add_file(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }

    pub fn summary(&self) -> String {
        let elapsed = self.start.elapsed().as_secs_f64();
        let throughput = if elapsed > 0.001 {
            self.bytes as f64 / elapsed / 1_048_576.0
        } else {
            0.0
        };
        format!(
            "Gorged {} files ({:.2} MB) in {:.1}s ({:.1} MB/s)",
            self.files,
            self.bytes as f64 / 1_048_576.0,
            elapsed,
            throughput
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
