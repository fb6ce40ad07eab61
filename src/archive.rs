//! Archive helper: collapse a path or glob into one tar artifact
//!
//! Archiving stays an external-command boundary: the system `tar` does the
//! work and the sender treats the produced file like any other single-file
//! source. The caller owns the temp file and deletes it after the send.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::fs_enum::glob_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
}

impl ArchiveKind {
    fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Tar => "tar",
            ArchiveKind::TarGz => "tar.gz",
        }
    }

    fn tar_flags(self) -> &'static str {
        match self {
            ArchiveKind::Tar => "-cf",
            ArchiveKind::TarGz => "-czf",
        }
    }
}

/// Collision-resistant name for the temp artifact, created in the working
/// directory so the logical path sent to the peer stays a bare file name.
pub fn temp_archive_name(kind: ArchiveKind) -> String {
    format!(
        "gorged_{}_{:04x}.{}",
        Local::now().format("%Y%m%d%H%M%S"),
        rand::random::<u16>(),
        kind.extension()
    )
}

/// Run `tar` (or `tar -z`) over the source and return the produced path.
/// Glob sources are expanded to explicit entry arguments first.
pub fn create_archive(kind: ArchiveKind, real_path: &str, filter: Option<&str>) -> Result<PathBuf> {
    let name = temp_archive_name(kind);
    let mut cmd = Command::new("tar");
    cmd.arg(kind.tar_flags()).arg(&name);

    match filter {
        Some(pattern) => {
            let mut matched = 0usize;
            let entries = std::fs::read_dir(real_path)
                .with_context(|| format!("listing {real_path}"))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("listing {real_path}"))?;
                let file_name = entry.file_name();
                let candidate = file_name.to_string_lossy();
                if entry.file_type()?.is_file() && glob_match(pattern, &candidate) {
                    cmd.arg(Path::new(real_path).join(&*candidate));
                    matched += 1;
                }
            }
            if matched == 0 {
                bail!("ERROR: No files matching {pattern} in {real_path}");
            }
        }
        None => {
            cmd.arg(real_path);
        }
    }

    let status = cmd.status().context("ERROR: tar could not be executed")?;
    if !status.success() {
        let _ = std::fs::remove_file(&name);
        bail!("ERROR: tar exited with status {status}");
    }
    Ok(PathBuf::from(name))
}
