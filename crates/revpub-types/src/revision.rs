use serde::{Deserialize, Serialize};
use std::fmt;

/// Revision selector for reads. `Head` resolves to the latest committed
/// revision at the time of the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Revision {
    #[default]
    Head,
    Number(u64),
}

impl Revision {
    /// Map the wire sentinel (`-1` means latest) onto a selector.
    pub fn from_sentinel(rev: i64) -> Self {
        if rev < 0 {
            Revision::Head
        } else {
            Revision::Number(rev as u64)
        }
    }

    pub fn from_option(rev: Option<u64>) -> Self {
        rev.map(Revision::Number).unwrap_or(Revision::Head)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Head => f.write_str("HEAD"),
            Revision::Number(n) => write!(f, "r{n}"),
        }
    }
}

/// Kind of node found at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    None,
    File,
    Dir,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::None => "none",
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
        }
    }
}
