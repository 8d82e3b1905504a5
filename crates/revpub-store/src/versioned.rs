use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use revpub_types::error::{Result, RevpubError};
use revpub_types::{ContentHash, Revision};

use crate::session::TreeSession;
use crate::tree::Dir;
use crate::{CommitInfo, LogEntry, StoreUrl};

/// One committed revision: metadata plus the full root tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub number: u64,
    pub author: Option<String>,
    pub message: String,
    pub date: DateTime<Utc>,
    pub root: Arc<Dir>,
}

impl RevisionRecord {
    pub(crate) fn initial() -> Self {
        Self {
            number: 0,
            author: None,
            message: String::new(),
            date: Utc::now(),
            root: Arc::new(Dir::new(0)),
        }
    }
}

/// Where a [`TreeStore`] keeps file contents and revision records.
pub(crate) trait Persistence: Send + Sync {
    fn read_blob(&self, hash: &ContentHash) -> Result<Vec<u8>>;
    fn write_blob(&self, hash: &ContentHash, data: &[u8]) -> Result<()>;
    /// Durably record a revision. Must fail with `OutOfDate` if a revision
    /// with the same number already exists.
    fn publish_revision(&self, record: &RevisionRecord) -> Result<()>;
    /// Revisions numbered `from` and above that were published by other
    /// handles on the same store.
    fn load_revisions(&self, from: u64) -> Result<Vec<RevisionRecord>>;
}

/// A versioned directory tree with a linear revision history.
///
/// Sessions share one `TreeStore` through an `Arc`; the revision list is
/// guarded by a single mutex held only for lookups and the final
/// compare-and-append of a commit.
pub struct TreeStore {
    root_url: StoreUrl,
    backend: Box<dyn Persistence>,
    revisions: Mutex<Vec<Arc<RevisionRecord>>>,
}

impl TreeStore {
    pub(crate) fn with_backend(
        root_url: StoreUrl,
        backend: Box<dyn Persistence>,
        revisions: Vec<RevisionRecord>,
    ) -> Self {
        Self {
            root_url,
            backend,
            revisions: Mutex::new(revisions.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn root_url(&self) -> &StoreUrl {
        &self.root_url
    }

    /// Open a new session. `author` is recorded on commits made through it.
    pub fn session(self: &Arc<Self>, author: Option<String>) -> TreeSession {
        TreeSession::new(Arc::clone(self), author)
    }

    fn lock_revisions(&self) -> MutexGuard<'_, Vec<Arc<RevisionRecord>>> {
        self.revisions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refresh(&self, revisions: &mut Vec<Arc<RevisionRecord>>) -> Result<()> {
        let next = revisions.len() as u64;
        for record in self.backend.load_revisions(next)? {
            if record.number != revisions.len() as u64 {
                return Err(RevpubError::Other(format!(
                    "revision history gap: expected r{}, found r{}",
                    revisions.len(),
                    record.number
                )));
            }
            revisions.push(Arc::new(record));
        }
        Ok(())
    }

    pub(crate) fn head(&self) -> Result<Arc<RevisionRecord>> {
        let mut revisions = self.lock_revisions();
        self.refresh(&mut revisions)?;
        revisions
            .last()
            .cloned()
            .ok_or_else(|| RevpubError::Other("store has no revisions".into()))
    }

    pub(crate) fn revision(&self, rev: Revision) -> Result<Arc<RevisionRecord>> {
        match rev {
            Revision::Head => self.head(),
            Revision::Number(n) => {
                let mut revisions = self.lock_revisions();
                if n as usize >= revisions.len() {
                    self.refresh(&mut revisions)?;
                }
                revisions
                    .get(n as usize)
                    .cloned()
                    .ok_or_else(|| RevpubError::NotFound(format!("revision {n}")))
            }
        }
    }

    pub(crate) fn date_of(&self, rev: u64) -> Option<DateTime<Utc>> {
        self.lock_revisions().get(rev as usize).map(|r| r.date)
    }

    pub(crate) fn read_blob(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        self.backend.read_blob(hash)
    }

    pub(crate) fn log(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let mut revisions = self.lock_revisions();
        self.refresh(&mut revisions)?;
        Ok(revisions
            .iter()
            .rev()
            .take(limit)
            .map(|r| LogEntry {
                revision: r.number,
                author: r.author.clone(),
                message: r.message.clone(),
                date: r.date,
            })
            .collect())
    }

    /// Append `root` as the revision after `base`. Fails with `OutOfDate`
    /// when another commit landed first.
    pub(crate) fn commit(
        &self,
        base: u64,
        author: Option<String>,
        message: &str,
        root: Dir,
        blobs: HashMap<ContentHash, Vec<u8>>,
    ) -> Result<CommitInfo> {
        for (hash, data) in &blobs {
            self.backend.write_blob(hash, data)?;
        }

        let mut revisions = self.lock_revisions();
        self.refresh(&mut revisions)?;
        let head = revisions.len() as u64 - 1;
        if head != base {
            return Err(RevpubError::OutOfDate { base, head });
        }
        let record = RevisionRecord {
            number: base + 1,
            author,
            message: message.to_string(),
            date: Utc::now(),
            root: Arc::new(root),
        };
        self.backend.publish_revision(&record)?;
        debug!(revision = record.number, files = blobs.len(), "committed revision");
        let info = CommitInfo {
            revision: record.number,
            author: record.author.clone(),
            date: record.date,
        };
        revisions.push(Arc::new(record));
        Ok(info)
    }
}
