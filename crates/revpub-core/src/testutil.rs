use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use revpub_store::{
    CommitEditor, CommitInfo, Connector, CopySource, DirEntry, LogEntry, MemoryRegistry,
    RemoteStore, StoreConnector, StoreUrl, TreeStore,
};
use revpub_types::error::{Result, RevpubError};
use revpub_types::{path, ContentHash, ModuleRevisionId, NodeKind, Revision};

use crate::config::PublishConfig;
use crate::cursor::CommitCursor;
use crate::dao::RemoteStoreClient;
use crate::transaction::PublishTransaction;

/// Shared handle to inspect the remote calls made through a `RecordingStore`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }
}

/// Session wrapper that records every remote call and every editor
/// operation. Optionally fails the n-th `commit_editor` call.
pub struct RecordingStore {
    inner: Box<dyn RemoteStore>,
    log: CallLog,
    commits: usize,
    fail_commit: Option<usize>,
}

impl RecordingStore {
    pub fn new(inner: Box<dyn RemoteStore>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            commits: 0,
            fail_commit: None,
        }
    }

    /// Make the `n`-th commit (1-based) fail to open.
    pub fn failing_commit(mut self, n: usize) -> Self {
        self.fail_commit = Some(n);
        self
    }
}

impl RemoteStore for RecordingStore {
    fn repository_root(&self) -> &StoreUrl {
        self.inner.repository_root()
    }

    fn check_path(&self, path: &str, rev: Revision) -> Result<NodeKind> {
        self.log.record(format!("check_path {path}"));
        self.inner.check_path(path, rev)
    }

    fn list_dir(&self, path: &str, rev: Revision) -> Result<Vec<DirEntry>> {
        self.log.record(format!("list_dir {path}"));
        self.inner.list_dir(path, rev)
    }

    fn info(&self, path: &str, rev: Revision) -> Result<Option<DirEntry>> {
        self.inner.info(path, rev)
    }

    fn get_file(&self, path: &str, rev: Revision, out: &mut dyn Write) -> Result<u64> {
        self.inner.get_file(path, rev, out)
    }

    fn latest_revision(&self) -> Result<u64> {
        self.inner.latest_revision()
    }

    fn log(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.inner.log(limit)
    }

    fn commit_editor(&mut self, message: &str) -> Result<Box<dyn CommitEditor>> {
        self.commits += 1;
        self.log.record("commit_editor");
        if self.fail_commit == Some(self.commits) {
            return Err(RevpubError::Other("injected commit failure".into()));
        }
        let inner = self.inner.commit_editor(message)?;
        Ok(Box::new(RecordingEditor {
            inner,
            log: self.log.clone(),
        }))
    }
}

struct RecordingEditor {
    inner: Box<dyn CommitEditor>,
    log: CallLog,
}

impl CommitEditor for RecordingEditor {
    fn open_root(&mut self) -> Result<()> {
        self.log.record("open_root");
        self.inner.open_root()
    }
    fn open_dir(&mut self, path: &str) -> Result<()> {
        self.log.record(format!("open_dir {path}"));
        self.inner.open_dir(path)
    }
    fn add_dir(&mut self, path: &str, copy_from: Option<CopySource>) -> Result<()> {
        match &copy_from {
            Some(src) => self.log.record(format!(
                "add_dir {path} from {}@{}",
                src.path, src.revision
            )),
            None => self.log.record(format!("add_dir {path}")),
        }
        self.inner.add_dir(path, copy_from)
    }
    fn close_dir(&mut self) -> Result<()> {
        self.log.record("close_dir");
        self.inner.close_dir()
    }
    fn add_file(&mut self, path: &str) -> Result<()> {
        self.log.record(format!("add_file {path}"));
        self.inner.add_file(path)
    }
    fn open_file(&mut self, path: &str) -> Result<()> {
        self.log.record(format!("open_file {path}"));
        self.inner.open_file(path)
    }
    fn apply_text(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.inner.apply_text(path, data)
    }
    fn close_file(&mut self, path: &str, checksum: &ContentHash) -> Result<()> {
        self.inner.close_file(path, checksum)
    }
    fn delete_entry(&mut self, path: &str) -> Result<()> {
        self.log.record(format!("delete_entry {path}"));
        self.inner.delete_entry(path)
    }
    fn close_edit(&mut self) -> Result<CommitInfo> {
        self.log.record("close_edit");
        self.inner.close_edit()
    }
    fn abort_edit(&mut self) -> Result<()> {
        self.log.record("abort_edit");
        self.inner.abort_edit()
    }
}

/// Connector that counts how many sessions it opened.
pub struct CountingConnector {
    inner: StoreConnector,
    connects: AtomicUsize,
}

impl CountingConnector {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(MemoryRegistry::new()))
    }

    pub fn with_registry(registry: Arc<MemoryRegistry>) -> Self {
        Self {
            inner: StoreConnector::new(registry, None),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for CountingConnector {
    fn connect(&self, url: &StoreUrl) -> Result<Box<dyn RemoteStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(url)
    }
}

pub fn memory_store(name: &str) -> Arc<TreeStore> {
    TreeStore::in_memory(StoreUrl::parse(&format!("mem://{name}")).unwrap())
}

/// Commit `files` as one revision, creating folders as needed.
pub fn seed(store: &Arc<TreeStore>, files: &[(&str, &[u8])]) -> u64 {
    let mut dao = RemoteStoreClient::new(Box::new(store.session(None)));
    let mut session = store.session(None);
    let mut cursor = CommitCursor::open(session.commit_editor("seed").unwrap()).unwrap();
    for (file, data) in files {
        let (folder, name) = path::split_file(file).unwrap();
        dao.put_file(&mut cursor, data, &folder, &name, true).unwrap();
    }
    cursor.close_edit().unwrap().revision
}

pub fn read(store: &Arc<TreeStore>, file: &str) -> Option<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    store
        .session(None)
        .get_file(file, Revision::Head, &mut out)
        .ok()
        .map(|_| out)
}

/// Child names of `folder` at head, sorted; empty when missing.
pub fn names(store: &Arc<TreeStore>, folder: &str) -> Vec<String> {
    crate::dao::list_names(&store.session(None), folder, Revision::Head)
        .unwrap()
        .into_iter()
        .collect()
}

pub fn kind(store: &Arc<TreeStore>, file: &str) -> NodeKind {
    store
        .session(None)
        .check_path(file, Revision::Head)
        .unwrap()
}

pub fn head(store: &Arc<TreeStore>) -> u64 {
    store.session(None).latest_revision().unwrap()
}

pub fn alias_config() -> PublishConfig {
    PublishConfig {
        alias: true,
        cleanup_publish_folder: true,
        ..PublishConfig::default()
    }
}

pub fn mrid(revision: &str) -> ModuleRevisionId {
    ModuleRevisionId::new("org", "mod", revision)
}

/// A transaction whose reader and committer sessions record into one log.
pub fn recorded_transaction(
    store: &Arc<TreeStore>,
    config: PublishConfig,
    revision: &str,
) -> (PublishTransaction, CallLog) {
    let log = CallLog::default();
    let reader = RecordingStore::new(Box::new(store.session(None)), log.clone());
    let committer = RecordingStore::new(Box::new(store.session(None)), log.clone());
    let tx = PublishTransaction::new(mrid(revision), config, Box::new(reader), Box::new(committer))
        .unwrap();
    (tx, log)
}
