use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use revpub_types::error::{Result, RevpubError};
use revpub_types::path;
use revpub_types::{NodeKind, Revision};

use crate::editor::TreeEditor;
use crate::tree::Node;
use crate::versioned::TreeStore;
use crate::{CommitEditor, DirEntry, LogEntry, RemoteStore, StoreUrl};

/// A [`RemoteStore`] session over a [`TreeStore`].
pub struct TreeSession {
    store: Arc<TreeStore>,
    author: Option<String>,
    editing: Arc<AtomicBool>,
}

impl TreeSession {
    pub(crate) fn new(store: Arc<TreeStore>, author: Option<String>) -> Self {
        Self {
            store,
            author,
            editing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.editing.load(Ordering::Acquire) {
            return Err(RevpubError::protocol(
                "session has an open commit; reads must use another session",
            ));
        }
        Ok(())
    }

    fn entry(&self, name: &str, node: &Node) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            kind: node.kind(),
            size: node.size(),
            revision: node.changed_rev(),
            date: self.store.date_of(node.changed_rev()),
        }
    }
}

impl RemoteStore for TreeSession {
    fn repository_root(&self) -> &StoreUrl {
        self.store.root_url()
    }

    fn check_path(&self, path: &str, rev: Revision) -> Result<NodeKind> {
        self.ensure_idle()?;
        let path = path::normalize_dir(path)?;
        Ok(self.store.revision(rev)?.root.kind_at(&path))
    }

    fn list_dir(&self, path: &str, rev: Revision) -> Result<Vec<DirEntry>> {
        self.ensure_idle()?;
        let path = path::normalize_dir(path)?;
        let record = self.store.revision(rev)?;
        let dir = record
            .root
            .dir_at(&path)
            .ok_or_else(|| RevpubError::NotFound(path.clone()))?;
        Ok(dir
            .entries
            .iter()
            .map(|(name, node)| self.entry(name, node))
            .collect())
    }

    fn info(&self, path: &str, rev: Revision) -> Result<Option<DirEntry>> {
        self.ensure_idle()?;
        let path = path::normalize_dir(path)?;
        let record = self.store.revision(rev)?;
        if path.is_empty() {
            let root = Node::Dir(Arc::clone(&record.root));
            return Ok(Some(self.entry("", &root)));
        }
        Ok(record
            .root
            .get(&path)
            .map(|node| self.entry(path::file_name(&path), node)))
    }

    fn get_file(&self, path: &str, rev: Revision, out: &mut dyn Write) -> Result<u64> {
        self.ensure_idle()?;
        let path = path::normalize_file(path)?;
        let record = self.store.revision(rev)?;
        match record.root.get(&path) {
            Some(Node::File(f)) => {
                let data = self.store.read_blob(&f.hash)?;
                out.write_all(&data)?;
                Ok(data.len() as u64)
            }
            Some(Node::Dir(_)) => Err(RevpubError::NotAFile(path)),
            None => Err(RevpubError::NotFound(path)),
        }
    }

    fn latest_revision(&self) -> Result<u64> {
        self.ensure_idle()?;
        Ok(self.store.head()?.number)
    }

    fn log(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.ensure_idle()?;
        self.store.log(limit)
    }

    fn commit_editor(&mut self, message: &str) -> Result<Box<dyn CommitEditor>> {
        if self
            .editing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RevpubError::protocol("session already has an open commit"));
        }
        let head = match self.store.head() {
            Ok(head) => head,
            Err(e) => {
                self.editing.store(false, Ordering::Release);
                return Err(e);
            }
        };
        Ok(Box::new(TreeEditor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.editing),
            head,
            self.author.clone(),
            message,
        )))
    }
}
