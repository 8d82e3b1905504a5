//! Copy-on-write directory tree shared between revisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use revpub_types::path;
use revpub_types::{ContentHash, NodeKind};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dir {
    pub changed_rev: u64,
    pub entries: BTreeMap<String, Node>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Dir(Arc<Dir>),
    File(Arc<FileNode>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub hash: ContentHash,
    pub size: u64,
    pub changed_rev: u64,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Dir(_) => NodeKind::Dir,
            Node::File(_) => NodeKind::File,
        }
    }

    pub fn changed_rev(&self) -> u64 {
        match self {
            Node::Dir(d) => d.changed_rev,
            Node::File(f) => f.changed_rev,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Node::Dir(_) => 0,
            Node::File(f) => f.size,
        }
    }
}

impl Dir {
    pub fn new(changed_rev: u64) -> Self {
        Self {
            changed_rev,
            entries: BTreeMap::new(),
        }
    }

    /// Directory at `path`; `""` is `self`.
    pub fn dir_at(&self, path: &str) -> Option<&Dir> {
        let mut current = self;
        for seg in path::segments(path) {
            match current.entries.get(seg)? {
                Node::Dir(d) => current = &**d,
                Node::File(_) => return None,
            }
        }
        Some(current)
    }

    /// Mutable directory at `path`, unsharing every directory on the way.
    pub fn dir_mut(&mut self, path: &str) -> Option<&mut Dir> {
        let mut current = self;
        for seg in path::segments(path) {
            match current.entries.get_mut(seg)? {
                Node::Dir(d) => current = Arc::make_mut(d),
                Node::File(_) => return None,
            }
        }
        Some(current)
    }

    /// Node at a non-root path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return None;
        }
        self.dir_at(path::parent(path))?
            .entries
            .get(path::file_name(path))
    }

    pub fn kind_at(&self, path: &str) -> NodeKind {
        if path.is_empty() {
            return NodeKind::Dir;
        }
        self.get(path).map(Node::kind).unwrap_or(NodeKind::None)
    }

    /// Stamp every directory from the root down to `path` as changed in `rev`.
    pub fn touch_path(&mut self, path: &str, rev: u64) {
        self.changed_rev = rev;
        let mut current = self;
        for seg in path::segments(path) {
            match current.entries.get_mut(seg) {
                Some(Node::Dir(d)) => {
                    let d = Arc::make_mut(d);
                    d.changed_rev = rev;
                    current = d;
                }
                _ => return,
            }
        }
    }
}
