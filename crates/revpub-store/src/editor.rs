use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use revpub_types::error::{Result, RevpubError};
use revpub_types::path;
use revpub_types::{ContentHash, Revision};

use crate::tree::{Dir, FileNode, Node};
use crate::versioned::{RevisionRecord, TreeStore};
use crate::{CommitEditor, CommitInfo, CopySource};

struct OpenFile {
    path: String,
    content: Option<Vec<u8>>,
}

/// Commit editor over a private working copy of the head tree.
///
/// Nothing is visible to other sessions until `close_edit` appends the
/// working tree as a new revision.
pub struct TreeEditor {
    store: Arc<TreeStore>,
    editing: Arc<AtomicBool>,
    author: Option<String>,
    message: String,
    base: u64,
    working: Dir,
    stack: Vec<String>,
    root_opened: bool,
    open_file: Option<OpenFile>,
    pending_blobs: HashMap<ContentHash, Vec<u8>>,
    deleted: HashSet<String>,
    finished: bool,
}

impl TreeEditor {
    pub(crate) fn new(
        store: Arc<TreeStore>,
        editing: Arc<AtomicBool>,
        head: Arc<RevisionRecord>,
        author: Option<String>,
        message: &str,
    ) -> Self {
        Self {
            store,
            editing,
            author,
            message: message.to_string(),
            base: head.number,
            working: (*head.root).clone(),
            stack: Vec::new(),
            root_opened: false,
            open_file: None,
            pending_blobs: HashMap::new(),
            deleted: HashSet::new(),
            finished: false,
        }
    }

    fn next_rev(&self) -> u64 {
        self.base + 1
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            return Err(RevpubError::protocol("commit already closed or aborted"));
        }
        Ok(())
    }

    /// Validate `path` and require its parent to be the open directory.
    fn child_of_top(&self, path: &str) -> Result<String> {
        self.ensure_active()?;
        if let Some(open) = &self.open_file {
            return Err(RevpubError::Protocol(format!(
                "file '{}' is still open",
                open.path
            )));
        }
        let path = path::normalize_file(path)?;
        let top = self
            .stack
            .last()
            .ok_or_else(|| RevpubError::protocol("no directory is open"))?;
        if path::parent(&path) != top.as_str() {
            return Err(RevpubError::Protocol(format!(
                "'{path}' is not a direct child of open directory '{top}'"
            )));
        }
        Ok(path)
    }

    fn parent_dir_mut(&mut self, path: &str) -> Result<&mut Dir> {
        self.working
            .dir_mut(path::parent(path))
            .ok_or_else(|| RevpubError::Protocol(format!("parent of '{path}' is not a directory")))
    }

    fn release(&mut self) {
        self.finished = true;
        self.editing.store(false, Ordering::Release);
    }
}

impl CommitEditor for TreeEditor {
    fn open_root(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.root_opened {
            return Err(RevpubError::protocol("root already opened"));
        }
        self.root_opened = true;
        self.stack.push(String::new());
        Ok(())
    }

    fn open_dir(&mut self, path: &str) -> Result<()> {
        let path = self.child_of_top(path)?;
        if self.working.dir_at(&path).is_none() {
            return Err(RevpubError::Protocol(format!(
                "cannot open '{path}': not a directory"
            )));
        }
        self.stack.push(path);
        Ok(())
    }

    fn add_dir(&mut self, path: &str, copy_from: Option<CopySource>) -> Result<()> {
        let path = self.child_of_top(path)?;
        if self.working.get(&path).is_some() {
            return Err(RevpubError::Protocol(format!("'{path}' already exists")));
        }
        let node = match copy_from {
            None => Dir::new(self.next_rev()),
            Some(src) => {
                if self
                    .deleted
                    .iter()
                    .any(|d| path::is_ancestor_or_self(d, &path))
                {
                    return Err(RevpubError::Protocol(format!(
                        "cannot copy onto '{path}': it was deleted in this commit"
                    )));
                }
                if src.revision > self.base {
                    return Err(RevpubError::Protocol(format!(
                        "copy source r{} is newer than commit base r{}",
                        src.revision, self.base
                    )));
                }
                let src_path = path::normalize_dir(&src.path)?;
                let record = self.store.revision(Revision::Number(src.revision))?;
                let dir = record.root.dir_at(&src_path).ok_or_else(|| {
                    RevpubError::NotFound(format!("{src_path}@{}", src.revision))
                })?;
                debug!(from = %src_path, to = %path, revision = src.revision, "copy directory");
                dir.clone()
            }
        };
        let rev = self.next_rev();
        let name = path::file_name(&path).to_string();
        self.parent_dir_mut(&path)?
            .entries
            .insert(name, Node::Dir(Arc::new(node)));
        self.working.touch_path(path::parent(&path), rev);
        self.stack.push(path);
        Ok(())
    }

    fn close_dir(&mut self) -> Result<()> {
        self.ensure_active()?;
        if let Some(open) = &self.open_file {
            return Err(RevpubError::Protocol(format!(
                "file '{}' is still open",
                open.path
            )));
        }
        self.stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| RevpubError::protocol("close_dir without an open directory"))
    }

    fn add_file(&mut self, path: &str) -> Result<()> {
        let path = self.child_of_top(path)?;
        if self.working.get(&path).is_some() {
            return Err(RevpubError::Protocol(format!("'{path}' already exists")));
        }
        self.open_file = Some(OpenFile {
            path,
            content: Some(Vec::new()),
        });
        Ok(())
    }

    fn open_file(&mut self, path: &str) -> Result<()> {
        let path = self.child_of_top(path)?;
        match self.working.get(&path) {
            Some(Node::File(_)) => {
                self.open_file = Some(OpenFile {
                    path,
                    content: None,
                });
                Ok(())
            }
            _ => Err(RevpubError::Protocol(format!(
                "cannot open '{path}': not a file"
            ))),
        }
    }

    fn apply_text(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.ensure_active()?;
        match &mut self.open_file {
            Some(open) if open.path == path => {
                open.content = Some(data.to_vec());
                Ok(())
            }
            _ => Err(RevpubError::Protocol(format!("file '{path}' is not open"))),
        }
    }

    fn close_file(&mut self, path: &str, checksum: &ContentHash) -> Result<()> {
        self.ensure_active()?;
        let open = match self.open_file.take() {
            Some(open) if open.path == path => open,
            other => {
                self.open_file = other;
                return Err(RevpubError::Protocol(format!("file '{path}' is not open")));
            }
        };
        let Some(data) = open.content else {
            // Opened but never written: content unchanged.
            return Ok(());
        };
        let actual = ContentHash::compute(&data);
        if &actual != checksum {
            return Err(RevpubError::ChecksumMismatch {
                path: open.path,
                expected: checksum.to_hex(),
                actual: actual.to_hex(),
            });
        }
        let rev = self.next_rev();
        let file = FileNode {
            hash: actual,
            size: data.len() as u64,
            changed_rev: rev,
        };
        let name = path::file_name(&open.path).to_string();
        self.parent_dir_mut(&open.path)?
            .entries
            .insert(name, Node::File(Arc::new(file)));
        self.working.touch_path(path::parent(&open.path), rev);
        self.pending_blobs.insert(actual, data);
        Ok(())
    }

    fn delete_entry(&mut self, path: &str) -> Result<()> {
        let path = self.child_of_top(path)?;
        let name = path::file_name(&path).to_string();
        let rev = self.next_rev();
        if self.parent_dir_mut(&path)?.entries.remove(&name).is_none() {
            return Err(RevpubError::Protocol(format!(
                "cannot delete '{path}': no such entry"
            )));
        }
        self.working.touch_path(path::parent(&path), rev);
        self.deleted.insert(path);
        Ok(())
    }

    fn close_edit(&mut self) -> Result<CommitInfo> {
        self.ensure_active()?;
        if !self.root_opened {
            return Err(RevpubError::protocol("close_edit before open_root"));
        }
        if let Some(top) = self.stack.last() {
            return Err(RevpubError::Protocol(format!(
                "directory '{top}' is still open"
            )));
        }
        let root = std::mem::take(&mut self.working);
        let blobs = std::mem::take(&mut self.pending_blobs);
        let info = self
            .store
            .commit(self.base, self.author.clone(), &self.message, root, blobs)?;
        self.release();
        Ok(info)
    }

    fn abort_edit(&mut self) -> Result<()> {
        self.ensure_active()?;
        debug!(base = self.base, "commit aborted");
        self.release();
        Ok(())
    }
}

impl Drop for TreeEditor {
    fn drop(&mut self) {
        if !self.finished {
            self.editing.store(false, Ordering::Release);
        }
    }
}
