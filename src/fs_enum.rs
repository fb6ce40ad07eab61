//! Item enumeration for the sender (directory walk + glob filter)

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// One unit the protocol transfers. The end sentinel is not an item; the
/// sender emits it directly after the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Directory marker, no body bytes.
    Dir { logical: String },
    /// Regular file with its size from stat.
    File { logical: String, size: u64 },
}

impl Item {
    pub fn logical(&self) -> &str {
        match self {
            Item::Dir { logical } => logical,
            Item::File { logical, .. } => logical,
        }
    }
}

/// Split a glob source like `dir/*.log` into `(real_path, Some(filter))`.
/// Sources without a wildcard pass through untouched.
pub fn split_glob(source: &str) -> (String, Option<String>) {
    if !source.contains('*') {
        return (source.to_owned(), None);
    }
    match source.rfind('/') {
        Some(idx) => (source[..idx].to_owned(), Some(source[idx + 1..].to_owned())),
        None => (".".to_owned(), Some(source.to_owned())),
    }
}

/// Produce the ordered item sequence for a directory walk: the walk-root
/// marker first (basename `.`), then a depth-first walk with every
/// subdirectory announced before its contents. The glob filter applies to
/// file names only. Logical paths are the walk paths exactly as the sender
/// sees them, with separators normalized to `/`.
pub fn enumerate_tree(root: &str, filter: Option<&str>) -> Result<Vec<Item>> {
    let root = root.trim_end_matches('/');
    let mut items = vec![Item::Dir {
        logical: format!("{root}/."),
    }];

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.with_context(|| format!("walking {root}"))?;
        let logical = logical_path(entry.path());
        if entry.file_type().is_dir() {
            items.push(Item::Dir { logical });
        } else if entry.file_type().is_file() {
            if let Some(pattern) = filter {
                if !glob_match(pattern, &entry.file_name().to_string_lossy()) {
                    continue;
                }
            }
            let size = entry
                .metadata()
                .with_context(|| format!("reading metadata of {logical}"))?
                .len();
            items.push(Item::File { logical, size });
        }
    }

    Ok(items)
}

fn logical_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Simple glob matching (supports * wildcards)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        if pattern.starts_with('*') && pattern.ends_with('*') {
            let middle = &pattern[1..pattern.len() - 1];
            return text.contains(middle);
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            return text.ends_with(suffix);
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            return text.starts_with(prefix);
        }
    }

    pattern == text
}
