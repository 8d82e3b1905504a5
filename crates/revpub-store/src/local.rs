//! Store persisted in a local directory.
//!
//! Layout:
//! ```text
//! <root>/format                 marker, created by `init_local`
//! <root>/revs/<number>          one rmp-serde RevisionRecord per revision
//! <root>/blobs/<shard>/<hex>    file contents keyed by BLAKE2b-256
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use revpub_types::error::{Result, RevpubError};
use revpub_types::ContentHash;

use crate::url::StoreUrl;
use crate::versioned::{Persistence, RevisionRecord, TreeStore};

const FORMAT_FILE: &str = "format";
const FORMAT_MARKER: &str = "revpub-store 1\n";

struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join("blobs")
            .join(hash.shard_prefix())
            .join(hash.to_hex())
    }

    fn revision_path(&self, number: u64) -> PathBuf {
        self.root.join("revs").join(format!("{number:010}"))
    }

    /// Write into a temp file beside `path`, then rename into place so
    /// readers never observe a partial file.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        let mut tmp = match tempfile::NamedTempFile::new_in(dir) {
            Ok(tmp) => tmp,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir_all(dir)?;
                tempfile::NamedTempFile::new_in(dir)?
            }
            Err(e) => return Err(e.into()),
        };
        tmp.write_all(data)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Persistence for LocalFiles {
    fn read_blob(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(hash)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RevpubError::NotFound(format!("blob {hash}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_blob(&self, hash: &ContentHash, data: &[u8]) -> Result<()> {
        let path = self.blob_path(hash);
        if path.exists() {
            return Ok(());
        }
        self.atomic_write(&path, data)
    }

    fn publish_revision(&self, record: &RevisionRecord) -> Result<()> {
        let path = self.revision_path(record.number);
        let data = rmp_serde::to_vec(record)?;
        let dir = self.root.join("revs");
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RevpubError::OutOfDate {
                    base: record.number.saturating_sub(1),
                    head: record.number,
                })
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn load_revisions(&self, from: u64) -> Result<Vec<RevisionRecord>> {
        let mut out: Vec<RevisionRecord> = Vec::new();
        let mut next = from;
        loop {
            let data = match fs::read(self.revision_path(next)) {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };
            out.push(rmp_serde::from_slice(&data)?);
            next += 1;
        }
        Ok(out)
    }
}

fn file_url(root: &Path) -> Result<StoreUrl> {
    StoreUrl::parse(&format!("file://{}", root.display()))
}

impl TreeStore {
    /// Create an empty store in `root`, which must not already hold one.
    pub fn init_local(root: &Path) -> Result<Arc<Self>> {
        if root.join(FORMAT_FILE).exists() {
            return Err(RevpubError::Other(format!(
                "store already exists at '{}'",
                root.display()
            )));
        }
        fs::create_dir_all(root.join("revs"))?;
        fs::create_dir_all(root.join("blobs"))?;
        let root = &fs::canonicalize(root)?;
        let files = LocalFiles {
            root: root.to_path_buf(),
        };
        let initial = RevisionRecord::initial();
        files.publish_revision(&initial)?;
        files.atomic_write(&root.join(FORMAT_FILE), FORMAT_MARKER.as_bytes())?;
        debug!(root = %root.display(), "initialized local store");
        Ok(Arc::new(TreeStore::with_backend(
            file_url(root)?,
            Box::new(files),
            vec![initial],
        )))
    }

    pub fn open_local(root: &Path) -> Result<Arc<Self>> {
        if !root.join(FORMAT_FILE).is_file() {
            return Err(RevpubError::NotFound(format!(
                "no store at '{}'",
                root.display()
            )));
        }
        let root = &fs::canonicalize(root)?;
        let files = LocalFiles {
            root: root.to_path_buf(),
        };
        let revisions = files.load_revisions(0)?;
        if revisions.is_empty() {
            return Err(RevpubError::Other(format!(
                "store at '{}' has no revisions",
                root.display()
            )));
        }
        Ok(Arc::new(TreeStore::with_backend(
            file_url(root)?,
            Box::new(files),
            revisions,
        )))
    }

    /// Open the store containing `path`, searching upward from it.
    pub fn locate_local(path: &Path) -> Result<Arc<Self>> {
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.join(FORMAT_FILE).is_file() {
                return Self::open_local(dir);
            }
            current = dir.parent();
        }
        Err(RevpubError::NotFound(format!(
            "no store at or above '{}'",
            path.display()
        )))
    }
}
