use tracing::debug;

use revpub_store::{CommitEditor, CommitInfo, CopySource};
use revpub_types::error::{Result, RevpubError};
use revpub_types::path;

/// An open commit plus the stack of directories currently open in it.
///
/// The stack always starts with the root (`""`) until the edit is closed
/// or aborted.
pub struct CommitCursor {
    editor: Box<dyn CommitEditor>,
    open: Vec<String>,
    finished: bool,
}

impl CommitCursor {
    /// Take ownership of a fresh editor and open its root.
    pub fn open(mut editor: Box<dyn CommitEditor>) -> Result<Self> {
        editor.open_root()?;
        Ok(Self {
            editor,
            open: vec![String::new()],
            finished: false,
        })
    }

    /// Directory currently on top of the stack.
    pub fn top(&self) -> &str {
        self.open.last().map(String::as_str).unwrap_or("")
    }

    pub fn is_open(&self, folder: &str) -> bool {
        self.open.iter().any(|p| p == folder)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn editor(&mut self) -> &mut dyn CommitEditor {
        self.editor.as_mut()
    }

    pub fn open_dir(&mut self, folder: &str) -> Result<()> {
        debug!(path = %folder, "open dir");
        self.editor.open_dir(folder)?;
        self.open.push(folder.to_string());
        Ok(())
    }

    pub fn add_dir(&mut self, folder: &str, copy_from: Option<CopySource>) -> Result<()> {
        debug!(path = %folder, copy = copy_from.is_some(), "add dir");
        self.editor.add_dir(folder, copy_from)?;
        self.open.push(folder.to_string());
        Ok(())
    }

    pub fn close_dir(&mut self) -> Result<()> {
        if self.open.is_empty() {
            return Err(RevpubError::protocol("no directory left to close"));
        }
        self.editor.close_dir()?;
        self.open.pop();
        Ok(())
    }

    /// Close directories until the top is `folder` or one of its ancestors.
    pub fn unwind_to(&mut self, folder: &str) -> Result<()> {
        while self.open.len() > 1 && !path::is_ancestor_or_self(self.top(), folder) {
            self.close_dir()?;
        }
        Ok(())
    }

    /// Close every open directory, then the edit itself.
    pub fn close_edit(&mut self) -> Result<CommitInfo> {
        while !self.open.is_empty() {
            self.close_dir()?;
        }
        let info = self.editor.close_edit()?;
        self.finished = true;
        Ok(info)
    }

    pub fn abort(&mut self) -> Result<()> {
        self.editor.abort_edit()?;
        self.open.clear();
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revpub_store::{RemoteStore, StoreUrl, TreeStore};

    fn cursor() -> CommitCursor {
        let store = TreeStore::in_memory(StoreUrl::parse("mem://cursor").unwrap());
        let mut session = store.session(None);
        CommitCursor::open(session.commit_editor("test").unwrap()).unwrap()
    }

    #[test]
    fn unwind_closes_only_unrelated_dirs() {
        let mut c = cursor();
        c.add_dir("a", None).unwrap();
        c.add_dir("a/b", None).unwrap();
        c.unwind_to("a/c").unwrap();
        assert_eq!(c.top(), "a");
        c.unwind_to("x").unwrap();
        assert_eq!(c.top(), "");
        assert!(c.is_open(""));
    }

    #[test]
    fn close_edit_closes_everything() {
        let mut c = cursor();
        c.add_dir("a", None).unwrap();
        c.add_dir("a/b", None).unwrap();
        let info = c.close_edit().unwrap();
        assert_eq!(info.revision, 1);
        assert!(c.is_finished());
    }

    #[test]
    fn abort_discards_edit() {
        let mut c = cursor();
        c.add_dir("a", None).unwrap();
        c.abort().unwrap();
        assert!(c.is_finished());
        assert!(c.abort().is_err());
    }
}
