use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use revpub_store::{CopySource, RemoteStore, StoreUrl};
use revpub_types::error::{Result, RevpubError};
use revpub_types::{path, ModuleRevisionId};

use crate::alias;
use crate::config::PublishConfig;
use crate::cursor::CommitCursor;
use crate::dao::RemoteStoreClient;
use crate::path_tree::{PathNode, PathTree, TreeVisitor};
use crate::upload::{PendingUpload, StagedUpload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Idle,
    CommitOpen,
    CommittedEmpty,
    CommittedWithChanges,
    AliasCopyOpen,
    AliasCopyClosed,
    Done,
    Aborted,
}

/// What `schedule` did with an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    Queued,
    /// Alias mode only: the permanent folder already exists and the
    /// upload did not ask to overwrite it.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Files written by the primary commit.
    pub written: usize,
    /// Destinations dropped at schedule time or left untouched at commit
    /// time because they existed and overwrite was off.
    pub skipped: Vec<String>,
    /// Revision of the primary commit; `None` when nothing was written.
    pub revision: Option<u64>,
    /// Revision of the alias copy commit, when one was needed.
    pub alias_revision: Option<u64>,
    /// `(permanent, alias)` folder pairs copied by the alias commit.
    pub aliased: Vec<(String, String)>,
}

/// A single-use batch of uploads committed atomically.
///
/// Uploads are grouped by folder and committed in one depth-first walk.
/// In alias mode they are staged into the alias folder and a second
/// commit copies each staged folder to its permanent location. If that
/// second commit fails, the alias folder keeps the new content from the
/// first commit while the permanent folder may be missing (it was deleted
/// for an overwrite) or stale.
pub struct PublishTransaction {
    mrid: ModuleRevisionId,
    config: PublishConfig,
    dao: RemoteStoreClient,
    committer: Box<dyn RemoteStore>,
    tree: PathTree<StagedUpload>,
    skipped: Vec<String>,
    ambiguous: Option<(String, String)>,
    state: CommitState,
    cursor: Option<CommitCursor>,
}

impl PublishTransaction {
    /// `reader` serves existence checks and listings while `committer`
    /// carries the commits; reads cannot share a session with an open
    /// commit.
    pub fn new(
        mrid: ModuleRevisionId,
        config: PublishConfig,
        reader: Box<dyn RemoteStore>,
        committer: Box<dyn RemoteStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mrid,
            config,
            dao: RemoteStoreClient::new(reader),
            committer,
            tree: PathTree::new(),
            skipped: Vec::new(),
            ambiguous: None,
            state: CommitState::Idle,
            cursor: None,
        })
    }

    pub fn module(&self) -> &ModuleRevisionId {
        &self.mrid
    }

    /// Root URL of the store the transaction commits to.
    pub fn store_root(&self) -> &StoreUrl {
        self.dao.store().repository_root()
    }

    pub fn state(&self) -> CommitState {
        self.state
    }

    pub fn has_commit_started(&self) -> bool {
        self.state != CommitState::Idle
    }

    /// Number of queued uploads.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn schedule(&mut self, upload: PendingUpload) -> Result<Scheduled> {
        if self.state != CommitState::Idle {
            return Err(RevpubError::protocol(
                "cannot schedule uploads after the commit has started",
            ));
        }
        let staged = match self.config.alias_folder() {
            None => StagedUpload::direct(upload),
            Some(alias_folder) => {
                if !upload.overwrite() && self.dao.folder_exists(upload.folder(), true)? {
                    warn!(
                        path = %upload.destination(),
                        module = %self.mrid,
                        "folder already published and overwrite is off; upload dropped"
                    );
                    self.skipped.push(upload.destination());
                    return Ok(Scheduled::Skipped);
                }
                let staging = match alias::alias_folder_path(
                    upload.folder(),
                    &self.mrid.revision,
                    alias_folder,
                ) {
                    Ok(staging) => staging,
                    Err(e) => {
                        self.ambiguous =
                            Some((upload.folder().to_string(), self.mrid.revision.clone()));
                        return Err(e);
                    }
                };
                StagedUpload {
                    folder: staging,
                    overwrite: true,
                    upload,
                }
            }
        };
        debug!(path = %staged.destination(), overwrite = staged.overwrite, "upload scheduled");
        let folder = staged.folder.clone();
        self.tree.insert(&folder, staged);
        Ok(Scheduled::Queued)
    }

    /// Commit every scheduled upload.
    ///
    /// On error the open commit is kept so the caller can [`abort`].
    ///
    /// [`abort`]: PublishTransaction::abort
    pub fn commit(&mut self) -> Result<PublishOutcome> {
        if self.state != CommitState::Idle {
            return Err(RevpubError::NotInitialized(format!(
                "commit already attempted (state {:?})",
                self.state
            )));
        }
        if let Some((folder, revision)) = self.ambiguous.clone() {
            return Err(RevpubError::AmbiguousRevisionPath { folder, revision });
        }

        let message = format!("Publishing {}", self.mrid);
        let mut cursor = CommitCursor::open(self.committer.commit_editor(&message)?)?;
        self.state = CommitState::CommitOpen;

        let written = match self.upload_all(&mut cursor) {
            Ok(written) => written,
            Err(e) => return Err(self.hold(cursor, e)),
        };
        if written == 0 {
            info!(module = %self.mrid, "nothing written; aborting empty commit");
            if let Err(e) = cursor.abort() {
                return Err(self.hold(cursor, e));
            }
            self.state = CommitState::CommittedEmpty;
            return Ok(PublishOutcome {
                skipped: self.skipped.clone(),
                ..PublishOutcome::default()
            });
        }

        let mapping = if self.config.alias {
            match alias::prepare_alias(&mut self.dao, &mut cursor, self.tree.uploads()) {
                Ok(mapping) => mapping,
                Err(e) => return Err(self.hold(cursor, e)),
            }
        } else {
            BTreeMap::new()
        };

        let committed = match cursor.close_edit() {
            Ok(info) => info,
            Err(e) => return Err(self.hold(cursor, e)),
        };
        self.state = CommitState::CommittedWithChanges;
        info!(module = %self.mrid, revision = committed.revision, written, "publish committed");

        let mut outcome = PublishOutcome {
            written,
            skipped: self.skipped.clone(),
            revision: Some(committed.revision),
            alias_revision: None,
            aliased: Vec::new(),
        };
        if !mapping.is_empty() {
            match self.copy_aliases(&mapping, committed.revision) {
                Ok(rev) => {
                    outcome.alias_revision = Some(rev);
                    outcome.aliased = mapping.into_iter().collect();
                }
                Err(e) => {
                    warn!(
                        module = %self.mrid,
                        revision = committed.revision,
                        error = %e,
                        "alias folders hold the new content but the copy to the \
                         permanent folders failed; they may be missing or stale"
                    );
                    return Err(e);
                }
            }
        }
        self.state = CommitState::Done;
        Ok(outcome)
    }

    /// Abort the open commit. Fails with `NotInitialized` when nothing is
    /// open: before `commit`, after it finished, or on a second call.
    pub fn abort(&mut self) -> Result<()> {
        let Some(mut cursor) = self.cursor.take() else {
            return Err(RevpubError::NotInitialized(
                "no open commit to abort".into(),
            ));
        };
        cursor.abort()?;
        self.state = CommitState::Aborted;
        info!(module = %self.mrid, "publish aborted");
        Ok(())
    }

    fn hold(&mut self, cursor: CommitCursor, err: RevpubError) -> RevpubError {
        if !cursor.is_finished() {
            debug!(module = %self.mrid, error = %err, "commit failed; left open for abort");
            self.cursor = Some(cursor);
        }
        err
    }

    fn upload_all(&mut self, cursor: &mut CommitCursor) -> Result<usize> {
        let mut walk = CommitWalk {
            dao: &mut self.dao,
            cursor,
            cleanup: self.config.cleanup_publish_folder,
            written: 0,
            skipped: &mut self.skipped,
        };
        self.tree.walk(&mut walk)?;
        Ok(walk.written)
    }

    fn copy_aliases(&mut self, mapping: &BTreeMap<String, String>, revision: u64) -> Result<u64> {
        self.state = CommitState::AliasCopyOpen;
        let message = format!("Publishing {} (alias {})", self.mrid, self.config.alias_folder);
        let mut cursor = CommitCursor::open(self.committer.commit_editor(&message)?)?;
        let result = copy_folders(&mut self.dao, &mut cursor, mapping, revision)
            .and_then(|()| cursor.close_edit());
        match result {
            Ok(info) => {
                self.state = CommitState::AliasCopyClosed;
                info!(
                    module = %self.mrid,
                    revision = info.revision,
                    folders = mapping.len(),
                    "alias copy committed"
                );
                Ok(info.revision)
            }
            Err(e) => Err(self.hold(cursor, e)),
        }
    }
}

fn copy_folders(
    dao: &mut RemoteStoreClient,
    cursor: &mut CommitCursor,
    mapping: &BTreeMap<String, String>,
    revision: u64,
) -> Result<()> {
    for (permanent, staging) in mapping {
        dao.create_folders(cursor, path::parent(permanent))?;
        cursor.add_dir(
            permanent,
            Some(CopySource {
                path: staging.clone(),
                revision,
            }),
        )?;
        cursor.close_dir()?;
    }
    Ok(())
}

/// Drives one commit over the batch's folder tree.
struct CommitWalk<'a> {
    dao: &'a mut RemoteStoreClient,
    cursor: &'a mut CommitCursor,
    cleanup: bool,
    written: usize,
    skipped: &'a mut Vec<String>,
}

impl CommitWalk<'_> {
    /// Delete entries not part of this batch. Child folders of the node
    /// are kept since the walk just published into them.
    fn clean_folder(&mut self, node: &PathNode<StagedUpload>) -> Result<()> {
        let keep: BTreeSet<&str> = node
            .uploads()
            .iter()
            .map(|s| s.upload.file_name())
            .chain(node.children().map(|c| c.name()))
            .collect();
        for name in self.dao.list_folder(node.path())? {
            if !keep.contains(name.as_str()) {
                self.dao
                    .delete_entry(self.cursor, &path::join(node.path(), &name))?;
            }
        }
        Ok(())
    }
}

impl TreeVisitor<StagedUpload> for CommitWalk<'_> {
    fn enter_folder(&mut self, node: &PathNode<StagedUpload>) -> Result<()> {
        self.dao.create_folders(self.cursor, node.path())
    }

    fn visit_uploads(&mut self, node: &PathNode<StagedUpload>) -> Result<()> {
        let mut written_here = 0;
        for staged in node.uploads() {
            let data = staged.upload.data()?;
            let written = self.dao.put_file(
                self.cursor,
                &data,
                &staged.folder,
                staged.upload.file_name(),
                staged.overwrite,
            )?;
            if written {
                written_here += 1;
            } else {
                info!(path = %staged.destination(), "file exists and overwrite is off; skipped");
                self.skipped.push(staged.destination());
            }
        }
        self.written += written_here;
        if self.cleanup && written_here > 0 {
            self.clean_folder(node)?;
        }
        Ok(())
    }

    fn leave_folder(&mut self, node: &PathNode<StagedUpload>) -> Result<()> {
        if self.cursor.top() != node.path() {
            return Err(RevpubError::Protocol(format!(
                "expected '{}' on top of the commit, found '{}'",
                node.path(),
                self.cursor.top()
            )));
        }
        self.cursor.close_dir()
    }
}
