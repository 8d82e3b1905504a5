//! Remote reads and the write primitives used inside an open commit.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;

use tracing::debug;

use revpub_store::RemoteStore;
use revpub_types::error::{Result, RevpubError};
use revpub_types::{path, ContentHash, NodeKind, Revision};

use crate::cursor::CommitCursor;

/// Wraps the read session used while publishing and remembers folders
/// known to exist.
///
/// The existence cache only grows. A folder missing from it may still
/// exist remotely; a folder present in it exists either remotely or in
/// the commit being built.
pub struct RemoteStoreClient {
    store: Box<dyn RemoteStore>,
    existing_folders: HashSet<String>,
}

impl RemoteStoreClient {
    pub fn new(store: Box<dyn RemoteStore>) -> Self {
        Self {
            store,
            existing_folders: HashSet::new(),
        }
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, folder: &str) -> bool {
        self.existing_folders.contains(folder)
    }

    pub fn folder_exists(&mut self, folder: &str, use_cache: bool) -> Result<bool> {
        if use_cache && self.existing_folders.contains(folder) {
            return Ok(true);
        }
        let exists = self.store.check_path(folder, Revision::Head)? == NodeKind::Dir;
        if exists {
            self.existing_folders.insert(folder.to_string());
        }
        Ok(exists)
    }

    pub fn file_exists(&self, file: &str) -> Result<bool> {
        Ok(self.store.check_path(file, Revision::Head)? == NodeKind::File)
    }

    /// Names of the direct children of `folder`; empty when it does not exist.
    pub fn list_folder(&self, folder: &str) -> Result<BTreeSet<String>> {
        list_names(self.store.as_ref(), folder, Revision::Head)
    }

    /// Navigate the commit to `folder`, opening existing directories and
    /// adding missing ones. Each missing directory is added once; later
    /// calls reuse the cache.
    pub fn create_folders(&mut self, cursor: &mut CommitCursor, folder: &str) -> Result<()> {
        cursor.unwind_to(folder)?;
        let mut missing = false;
        for prefix in path::prefixes(folder) {
            if cursor.is_open(&prefix) {
                continue;
            }
            if !missing && self.folder_exists(&prefix, true)? {
                cursor.open_dir(&prefix)?;
            } else {
                missing = true;
                cursor.add_dir(&prefix, None)?;
                self.existing_folders.insert(prefix);
            }
        }
        Ok(())
    }

    /// Write `data` to `folder/name`. Returns `false` without touching the
    /// commit when the file exists and `overwrite` is off.
    pub fn put_file(
        &mut self,
        cursor: &mut CommitCursor,
        data: &[u8],
        folder: &str,
        name: &str,
        overwrite: bool,
    ) -> Result<bool> {
        let file = path::join(folder, name);
        let exists = self.file_exists(&file)?;
        if exists && !overwrite {
            debug!(path = %file, "file exists and overwrite is off; skipping");
            return Ok(false);
        }
        self.create_folders(cursor, folder)?;
        let editor = cursor.editor();
        if exists {
            editor.open_file(&file)?;
        } else {
            editor.add_file(&file)?;
        }
        editor.apply_text(&file, data)?;
        editor.close_file(&file, &ContentHash::compute(data))?;
        debug!(path = %file, bytes = data.len(), replaced = exists, "file written");
        Ok(true)
    }

    /// Delete `entry` inside the commit, navigating to its parent first.
    pub fn delete_entry(&mut self, cursor: &mut CommitCursor, entry: &str) -> Result<()> {
        self.create_folders(cursor, path::parent(entry))?;
        debug!(path = %entry, "delete entry");
        cursor.editor().delete_entry(entry)
    }
}

/// Names of the direct children of `folder` at `rev`; empty when the
/// folder does not exist.
pub fn list_names(store: &dyn RemoteStore, folder: &str, rev: Revision) -> Result<BTreeSet<String>> {
    if store.check_path(folder, rev)? != NodeKind::Dir {
        return Ok(BTreeSet::new());
    }
    Ok(store
        .list_dir(folder, rev)?
        .into_iter()
        .map(|e| e.name)
        .collect())
}

/// Copy a file's content into `out`. Fails with `NotAFile` when the
/// target is absent or a directory.
pub fn fetch_file(
    store: &dyn RemoteStore,
    file: &str,
    out: &mut dyn Write,
    rev: Revision,
) -> Result<u64> {
    match store.check_path(file, rev)? {
        NodeKind::File => store.get_file(file, rev, out),
        NodeKind::Dir | NodeKind::None => Err(RevpubError::NotAFile(file.to_string())),
    }
}
