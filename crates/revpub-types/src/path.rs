//! Root-relative store paths.
//!
//! Paths are `/`-separated, carry no leading or trailing separator, and
//! the empty string denotes the store root.

use crate::error::{Result, RevpubError};

fn validate_segments(original: &str, trimmed: &str) -> Result<()> {
    if trimmed.contains('\\') {
        return Err(RevpubError::InvalidPath(original.to_string()));
    }
    for seg in trimmed.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(RevpubError::InvalidPath(original.to_string()));
        }
    }
    Ok(())
}

/// Normalize a folder path: strips leading and trailing separators and
/// rejects empty, `.` and `..` segments. Returns `""` for the root.
pub fn normalize_dir(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    validate_segments(path, trimmed)?;
    Ok(trimmed.to_string())
}

/// Normalize a file path. Unlike folders, a file path must name an entry,
/// so a trailing separator or an empty path is rejected.
pub fn normalize_file(path: &str) -> Result<String> {
    if path.ends_with('/') {
        return Err(RevpubError::InvalidPath(path.to_string()));
    }
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(RevpubError::InvalidPath(path.to_string()));
    }
    validate_segments(path, trimmed)?;
    Ok(trimmed.to_string())
}

/// Split a file path into `(folder, file_name)`.
pub fn split_file(path: &str) -> Result<(String, String)> {
    let normalized = normalize_file(path)?;
    match normalized.rsplit_once('/') {
        Some((folder, name)) => Ok((folder.to_string(), name.to_string())),
        None => Ok((String::new(), normalized)),
    }
}

/// Parent folder of a normalized path (`""` for top-level entries).
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

/// Last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, n)| n).unwrap_or(path)
}

pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Every non-root prefix of `path`, shallowest first:
/// `a/b/c` yields `a`, `a/b`, `a/b/c`.
pub fn prefixes(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for seg in segments(path) {
        current = join(&current, seg);
        out.push(current.clone());
    }
    out
}

/// True when `ancestor` is `path` itself or one of its parent folders.
pub fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_dir_strips_separators() {
        assert_eq!(normalize_dir("/org/mod/").unwrap(), "org/mod");
        assert_eq!(normalize_dir("").unwrap(), "");
        assert_eq!(normalize_dir("/").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_traversal_and_empty_segments() {
        assert!(normalize_dir("org/../etc").is_err());
        assert!(normalize_dir("org//mod").is_err());
        assert!(normalize_dir("org/./mod").is_err());
        assert!(normalize_dir("org\\mod").is_err());
    }

    #[test]
    fn file_path_must_not_end_in_separator() {
        let err = normalize_file("org/mod/1.0/").unwrap_err();
        assert!(matches!(err, RevpubError::InvalidPath(_)));
        assert!(normalize_file("").is_err());
    }

    #[test]
    fn split_file_paths() {
        assert_eq!(
            split_file("org/mod/1.0/a.jar").unwrap(),
            ("org/mod/1.0".to_string(), "a.jar".to_string())
        );
        assert_eq!(
            split_file("/a.jar").unwrap(),
            (String::new(), "a.jar".to_string())
        );
    }

    #[test]
    fn parent_and_name() {
        assert_eq!(parent("a/b/c"), "a/b");
        assert_eq!(parent("a"), "");
        assert_eq!(file_name("a/b/c"), "c");
        assert_eq!(file_name("a"), "a");
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a/b");
    }

    #[test]
    fn prefixes_shallowest_first() {
        assert_eq!(prefixes("a/b/c"), vec!["a", "a/b", "a/b/c"]);
        assert!(prefixes("").is_empty());
    }

    #[test]
    fn ancestry() {
        assert!(is_ancestor_or_self("", "a/b"));
        assert!(is_ancestor_or_self("a", "a/b"));
        assert!(is_ancestor_or_self("a/b", "a/b"));
        assert!(!is_ancestor_or_self("a/b", "a/bc"));
        assert!(!is_ancestor_or_self("a/b/c", "a/b"));
    }
}
