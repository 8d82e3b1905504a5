pub mod connector;
mod editor;
mod local;
mod memory;
pub mod session;
pub mod tree;
pub mod url;
mod versioned;

use std::io::Write;

use chrono::{DateTime, Utc};
use revpub_types::error::Result;
use revpub_types::{ContentHash, NodeKind, Revision};

pub use connector::{MemoryRegistry, StoreConnector};
pub use session::TreeSession;
pub use url::StoreUrl;
pub use versioned::TreeStore;

/// A direct child of a directory, or the node at a path for [`RemoteStore::info`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    /// Revision that last changed this entry.
    pub revision: u64,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub revision: u64,
    pub author: Option<String>,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// Result of a successfully closed commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    pub revision: u64,
    pub author: Option<String>,
    pub date: DateTime<Utc>,
}

/// Source of a server-side directory copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopySource {
    pub path: String,
    pub revision: u64,
}

/// One authenticated session against a versioned store.
///
/// All paths are relative to the store root. A session is used by one
/// caller at a time; while an editor obtained from [`commit_editor`] is
/// open, the session's read calls fail with a protocol error.
///
/// [`commit_editor`]: RemoteStore::commit_editor
pub trait RemoteStore: Send {
    /// URL of the store root this session is bound to.
    fn repository_root(&self) -> &StoreUrl;

    fn check_path(&self, path: &str, rev: Revision) -> Result<NodeKind>;

    /// Direct children of a directory. Fails with `NotFound` if `path` is
    /// not a directory at `rev`.
    fn list_dir(&self, path: &str, rev: Revision) -> Result<Vec<DirEntry>>;

    fn info(&self, path: &str, rev: Revision) -> Result<Option<DirEntry>>;

    /// Stream a file's content into `out`, returning the number of bytes written.
    fn get_file(&self, path: &str, rev: Revision, out: &mut dyn Write) -> Result<u64>;

    fn latest_revision(&self) -> Result<u64>;

    /// Newest first.
    fn log(&self, limit: usize) -> Result<Vec<LogEntry>>;

    /// Open a commit against the current head.
    fn commit_editor(&mut self, message: &str) -> Result<Box<dyn CommitEditor>>;
}

/// Write side of the commit protocol.
///
/// Directories are opened and closed in strict nesting order starting at
/// the root. Every path-taking call requires the path's parent to be the
/// directory currently on top of the open stack.
pub trait CommitEditor: Send {
    fn open_root(&mut self) -> Result<()>;
    fn open_dir(&mut self, path: &str) -> Result<()>;
    fn add_dir(&mut self, path: &str, copy_from: Option<CopySource>) -> Result<()>;
    fn close_dir(&mut self) -> Result<()>;
    fn add_file(&mut self, path: &str) -> Result<()>;
    fn open_file(&mut self, path: &str) -> Result<()>;
    /// Replace the open file's content in full.
    fn apply_text(&mut self, path: &str, data: &[u8]) -> Result<()>;
    fn close_file(&mut self, path: &str, checksum: &ContentHash) -> Result<()>;
    fn delete_entry(&mut self, path: &str) -> Result<()>;
    /// Make the transaction durable. Requires every directory to be closed.
    fn close_edit(&mut self) -> Result<CommitInfo>;
    fn abort_edit(&mut self) -> Result<()>;
}

/// Opens sessions for store URLs.
pub trait Connector: Send + Sync {
    fn connect(&self, url: &StoreUrl) -> Result<Box<dyn RemoteStore>>;
}
