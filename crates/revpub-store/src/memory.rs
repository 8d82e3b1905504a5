use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use revpub_types::error::{Result, RevpubError};
use revpub_types::ContentHash;

use crate::url::StoreUrl;
use crate::versioned::{Persistence, RevisionRecord, TreeStore};

/// Blob storage for a store that lives only in this process. Revisions
/// are kept by the [`TreeStore`] itself.
#[derive(Default)]
struct MemoryBlobs {
    blobs: Mutex<HashMap<ContentHash, Vec<u8>>>,
}

impl Persistence for MemoryBlobs {
    fn read_blob(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(hash)
            .cloned()
            .ok_or_else(|| RevpubError::NotFound(format!("blob {hash}")))
    }

    fn write_blob(&self, hash: &ContentHash, data: &[u8]) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(*hash)
            .or_insert_with(|| data.to_vec());
        Ok(())
    }

    fn publish_revision(&self, _record: &RevisionRecord) -> Result<()> {
        Ok(())
    }

    fn load_revisions(&self, _from: u64) -> Result<Vec<RevisionRecord>> {
        Ok(Vec::new())
    }
}

impl TreeStore {
    /// Empty in-process store at revision 0.
    pub fn in_memory(root_url: StoreUrl) -> Arc<Self> {
        Arc::new(TreeStore::with_backend(
            root_url,
            Box::new(MemoryBlobs::default()),
            vec![RevisionRecord::initial()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommitEditor, CopySource, RemoteStore};
    use revpub_types::{NodeKind, Revision};

    fn store() -> Arc<TreeStore> {
        TreeStore::in_memory(StoreUrl::parse("mem://test").unwrap())
    }

    fn put(editor: &mut dyn CommitEditor, path: &str, data: &[u8]) {
        editor.add_file(path).unwrap();
        editor.apply_text(path, data).unwrap();
        editor
            .close_file(path, &ContentHash::compute(data))
            .unwrap();
    }

    #[test]
    fn commit_creates_revision() {
        let store = store();
        let mut session = store.session(Some("ci".into()));
        let mut ed = session.commit_editor("first").unwrap();
        ed.open_root().unwrap();
        ed.add_dir("org", None).unwrap();
        put(ed.as_mut(), "org/a.jar", b"aaa");
        ed.close_dir().unwrap();
        ed.close_dir().unwrap();
        let info = ed.close_edit().unwrap();
        assert_eq!(info.revision, 1);
        assert_eq!(info.author.as_deref(), Some("ci"));
        drop(ed);

        assert_eq!(session.latest_revision().unwrap(), 1);
        assert_eq!(
            session.check_path("org/a.jar", Revision::Head).unwrap(),
            NodeKind::File
        );
        assert_eq!(
            session.check_path("org/a.jar", Revision::Number(0)).unwrap(),
            NodeKind::None
        );
        let mut out: Vec<u8> = Vec::new();
        let n = session
            .get_file("org/a.jar", Revision::Head, &mut out)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, b"aaa");
        let log = session.log(10).unwrap();
        assert_eq!(log[0].message, "first");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn reads_fail_while_commit_open() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("m").unwrap();
        let err = session.check_path("", Revision::Head).unwrap_err();
        assert!(matches!(err, RevpubError::Protocol(_)));
        ed.abort_edit().unwrap();
        assert_eq!(
            session.check_path("", Revision::Head).unwrap(),
            NodeKind::Dir
        );
    }

    #[test]
    fn dropping_editor_releases_session() {
        let store = store();
        let mut session = store.session(None);
        let ed = session.commit_editor("m").unwrap();
        drop(ed);
        assert!(session.latest_revision().is_ok());
    }

    #[test]
    fn nesting_is_enforced() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("m").unwrap();
        assert!(ed.add_dir("org", None).is_err(), "root not opened");
        ed.open_root().unwrap();
        let err = ed.add_dir("org/mod", None).unwrap_err();
        assert!(matches!(err, RevpubError::Protocol(_)));
        ed.add_dir("org", None).unwrap();
        assert!(ed.add_dir("other", None).is_err(), "not a child of org");
        assert!(ed.close_edit().is_err(), "directories still open");
        ed.close_dir().unwrap();
        assert!(ed.add_dir("org", None).is_err(), "created twice");
        ed.close_dir().unwrap();
        assert!(ed.close_dir().is_err());
        ed.close_edit().unwrap();
    }

    #[test]
    fn checksum_must_match() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("m").unwrap();
        ed.open_root().unwrap();
        ed.add_file("a.jar").unwrap();
        ed.apply_text("a.jar", b"abc").unwrap();
        let err = ed
            .close_file("a.jar", &ContentHash::compute(b"xyz"))
            .unwrap_err();
        assert!(matches!(err, RevpubError::ChecksumMismatch { .. }));
    }

    #[test]
    fn stale_commit_is_out_of_date() {
        let store = store();
        let mut first = store.session(None);
        let mut second = store.session(None);
        let mut a = first.commit_editor("a").unwrap();
        let mut b = second.commit_editor("b").unwrap();
        a.open_root().unwrap();
        a.close_dir().unwrap();
        a.close_edit().unwrap();
        b.open_root().unwrap();
        b.close_dir().unwrap();
        let err = b.close_edit().unwrap_err();
        assert!(matches!(err, RevpubError::OutOfDate { base: 0, head: 1 }));
        b.abort_edit().unwrap();
    }

    #[test]
    fn directory_copy_shares_content() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("upload").unwrap();
        ed.open_root().unwrap();
        ed.add_dir("LATEST", None).unwrap();
        put(ed.as_mut(), "LATEST/a.jar", b"jar");
        ed.close_dir().unwrap();
        ed.close_dir().unwrap();
        let rev = ed.close_edit().unwrap().revision;
        drop(ed);

        let mut ed = session.commit_editor("copy").unwrap();
        ed.open_root().unwrap();
        ed.add_dir(
            "1.0",
            Some(CopySource {
                path: "LATEST".into(),
                revision: rev,
            }),
        )
        .unwrap();
        ed.close_dir().unwrap();
        ed.close_dir().unwrap();
        ed.close_edit().unwrap();
        drop(ed);

        let mut out: Vec<u8> = Vec::new();
        session
            .get_file("1.0/a.jar", Revision::Head, &mut out)
            .unwrap();
        assert_eq!(out, b"jar");
    }

    #[test]
    fn copy_onto_deleted_path_is_rejected() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("seed").unwrap();
        ed.open_root().unwrap();
        ed.add_dir("src", None).unwrap();
        ed.close_dir().unwrap();
        ed.add_dir("dst", None).unwrap();
        ed.close_dir().unwrap();
        ed.close_dir().unwrap();
        let rev = ed.close_edit().unwrap().revision;
        drop(ed);

        let mut ed = session.commit_editor("replace").unwrap();
        ed.open_root().unwrap();
        ed.delete_entry("dst").unwrap();
        let err = ed
            .add_dir(
                "dst",
                Some(CopySource {
                    path: "src".into(),
                    revision: rev,
                }),
            )
            .unwrap_err();
        assert!(matches!(err, RevpubError::Protocol(_)));
    }

    #[test]
    fn get_file_on_directory_is_not_a_file() {
        let store = store();
        let mut session = store.session(None);
        let mut ed = session.commit_editor("seed").unwrap();
        ed.open_root().unwrap();
        ed.add_dir("org", None).unwrap();
        ed.close_dir().unwrap();
        ed.close_dir().unwrap();
        ed.close_edit().unwrap();
        drop(ed);

        let mut out: Vec<u8> = Vec::new();
        let err = session
            .get_file("org", Revision::Head, &mut out)
            .unwrap_err();
        assert!(matches!(err, RevpubError::NotAFile(_)));
        let err = session
            .get_file("missing", Revision::Head, &mut out)
            .unwrap_err();
        assert!(matches!(err, RevpubError::NotFound(_)));
    }
}
