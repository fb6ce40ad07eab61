//! Receiver-side path handling
//!
//! Logical paths arrive from an untrusted peer; [`sanitize`] reduces them to
//! a relative path that can never climb out of the receiving root.

/// Normalize a peer-supplied logical path to a safe, root-relative path.
///
/// Backslashes become forward slashes and a Windows drive prefix is dropped,
/// then the path is normalized component by component: empty and `.`
/// components disappear, `..` pops the previous component and never walks
/// past the front. The result contains no leading separator and no `..`.
pub fn sanitize(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    let has_drive = {
        let bytes = p.as_bytes();
        bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
    };
    if has_drive {
        p = p[2..].to_owned();
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in p.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            normal => parts.push(normal),
        }
    }
    parts.join("/")
}

/// Split a logical path into `(parent, basename)` on the last slash.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Size shown in operator prompts: MB for items of a GiB and up, KB below.
pub fn human_size(bytes: i64) -> String {
    const GIB: i64 = 1024 * 1024 * 1024;
    if bytes >= GIB {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize("./path/../evil.txt"), "evil.txt");
        assert_eq!(sanitize("../../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize("a/../../b"), "b");
        assert_eq!(sanitize("a/b/../c"), "a/c");
    }

    #[test]
    fn sanitize_strips_prefixes() {
        assert_eq!(sanitize("/abs/file"), "abs/file");
        assert_eq!(sanitize("C:\\Users\\me\\f.txt"), "Users/me/f.txt");
        assert_eq!(sanitize("c:/tmp/x"), "tmp/x");
        assert_eq!(sanitize("./A/b.txt"), "A/b.txt");
    }

    #[test]
    fn sanitize_collapses_separators() {
        assert_eq!(sanitize("a//b///c"), "a/b/c");
        assert_eq!(sanitize("a\\b\\c"), "a/b/c");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in [
            "./path/../evil.txt",
            "C:\\x\\..\\y",
            "/leading/sep",
            "plain/file.txt",
            "A/.",
            "....//x",
        ] {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn sanitize_never_emits_parent_components() {
        for raw in ["..", "../..", "a/../../..", "..\\..\\x"] {
            let clean = sanitize(raw);
            assert!(
                !clean.split('/').any(|c| c == ".."),
                "{raw:?} sanitized to {clean:?}"
            );
            assert!(!clean.starts_with('/'));
        }
    }

    #[test]
    fn split_on_last_slash() {
        assert_eq!(split_path("A/sub/c.bin"), ("A/sub", "c.bin"));
        assert_eq!(split_path("A/."), ("A", "."));
        assert_eq!(split_path("file.txt"), ("", "file.txt"));
    }

    #[test]
    fn size_units_switch_at_one_gib() {
        assert_eq!(human_size(512), "0.50 KB");
        assert_eq!(human_size(13), "0.01 KB");
        assert!(human_size((1 << 30) - 1).ends_with(" KB"));
        assert_eq!(human_size(1 << 30), "1024.00 MB");
        assert_eq!(human_size(3 << 30), "3072.00 MB");
    }
}
