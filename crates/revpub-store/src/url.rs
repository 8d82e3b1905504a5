use std::fmt;
use std::path::PathBuf;

use revpub_types::error::{Result, RevpubError};
use revpub_types::path;

/// `scheme://host/path` locator for a store or a path inside one.
///
/// The path is kept normalized (no leading or trailing `/`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl StoreUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| RevpubError::Config(format!("invalid store URL '{url}'")))?;
        if scheme.is_empty() {
            return Err(RevpubError::Config(format!(
                "invalid store URL '{url}': missing scheme"
            )));
        }
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            path: path::normalize_dir(path)?,
        })
    }

    /// Key shared by every URL reachable through one connection.
    pub fn connection_key(&self) -> String {
        format!("{}:{}", self.scheme, self.host)
    }

    pub fn join(&self, relative: &str) -> Result<Self> {
        let relative = path::normalize_dir(relative)?;
        let mut out = self.clone();
        if !relative.is_empty() {
            out.path = path::join(&self.path, &relative);
        }
        Ok(out)
    }

    /// Path of `self` relative to `root`, or `None` when `self` is not
    /// under `root`.
    pub fn relative_to(&self, root: &StoreUrl) -> Option<String> {
        if self.scheme != root.scheme || self.host != root.host {
            return None;
        }
        if !path::is_ancestor_or_self(&root.path, &self.path) {
            return None;
        }
        let rest = &self.path[root.path.len()..];
        Some(rest.trim_start_matches('/').to_string())
    }

    /// Local filesystem path for `file://` URLs.
    pub fn to_file_path(&self) -> PathBuf {
        PathBuf::from(format!("/{}", self.path))
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        } else if self.host.is_empty() {
            f.write_str("/")?;
        }
        Ok(())
    }
}
