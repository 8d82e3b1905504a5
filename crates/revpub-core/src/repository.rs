use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use revpub_store::{Connector, LogEntry, StoreUrl};
use revpub_types::error::{Result, RevpubError};
use revpub_types::{ModuleRevisionId, NodeKind, Revision};

use crate::config::RevpubConfig;
use crate::connection_cache::{lock_store, ConnectionCache, SharedStore};
use crate::dao;
use crate::transaction::{PublishOutcome, PublishTransaction, Scheduled};
use crate::upload::{EphemeralPolicy, PendingUpload, UploadSource};

/// Metadata for one path, as seen by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub exists: bool,
    pub kind: NodeKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Resource {
    fn missing(path: &str) -> Self {
        Self {
            path: path.to_string(),
            exists: false,
            kind: NodeKind::None,
            size: 0,
            last_modified: None,
        }
    }
}

/// Caller-facing handle on one configured repository: publish sessions
/// plus reads through a cached connection.
pub struct ArtifactRepository {
    config: RevpubConfig,
    root: StoreUrl,
    connector: Arc<dyn Connector>,
    connections: Arc<ConnectionCache>,
    ephemeral: EphemeralPolicy,
    module: Option<ModuleRevisionId>,
    transaction: Option<PublishTransaction>,
}

impl ArtifactRepository {
    /// Validates the configuration before anything is opened.
    pub fn new(
        config: RevpubConfig,
        connector: Arc<dyn Connector>,
        connections: Arc<ConnectionCache>,
    ) -> Result<Self> {
        config.validate()?;
        let root = StoreUrl::parse(&config.repository.url)?;
        let ephemeral = EphemeralPolicy::new(config.publish.temp_prefix.clone());
        Ok(Self {
            config,
            root,
            connector,
            connections,
            ephemeral,
            module: None,
            transaction: None,
        })
    }

    pub fn root(&self) -> &StoreUrl {
        &self.root
    }

    pub fn config(&self) -> &RevpubConfig {
        &self.config
    }

    fn read_revision(&self) -> Revision {
        Revision::from_option(self.config.repository.retrieve_revision)
    }

    /// In-store path for `location`, which is either relative to the
    /// configured root or a full URL under it.
    fn store_path(&self, store_root: &StoreUrl, location: &str) -> Result<String> {
        let url = if location.contains("://") {
            let url = StoreUrl::parse(location)?;
            if url.relative_to(&self.root).is_none() {
                return Err(RevpubError::InvalidPath(format!(
                    "{location} is outside repository {}",
                    self.root
                )));
            }
            url
        } else {
            self.root.join(location)?
        };
        url.relative_to(store_root).ok_or_else(|| {
            RevpubError::InvalidPath(format!("{url} is outside store {store_root}"))
        })
    }

    fn connection(&self) -> Result<SharedStore> {
        self.connections
            .get_or_connect(self.connector.as_ref(), &self.root)
    }

    pub fn begin_publish_transaction(&mut self, mrid: ModuleRevisionId) -> Result<()> {
        if self.transaction.is_some() {
            return Err(RevpubError::protocol(
                "a publish transaction is already in progress",
            ));
        }
        debug!(module = %mrid, "begin publish");
        self.module = Some(mrid);
        Ok(())
    }

    /// Schedule one file. The first call opens the two sessions the
    /// transaction uses; they bypass the connection cache since a commit
    /// holds its session until it closes.
    pub fn put(
        &mut self,
        source: UploadSource,
        destination: &str,
        overwrite: bool,
    ) -> Result<Scheduled> {
        if destination.ends_with('/') {
            return Err(RevpubError::InvalidPath(format!(
                "{destination}: can only publish files, not folders"
            )));
        }
        let mut tx = match self.transaction.take() {
            Some(tx) => tx,
            None => self.open_transaction()?,
        };
        let result = self.schedule_into(&mut tx, source, destination, overwrite);
        self.transaction = Some(tx);
        result
    }

    fn open_transaction(&self) -> Result<PublishTransaction> {
        let mrid = self.module.clone().ok_or_else(|| {
            RevpubError::NotInitialized("put called before begin_publish_transaction".into())
        })?;
        let reader = self.connector.connect(&self.root)?;
        let committer = self.connector.connect(&self.root)?;
        PublishTransaction::new(mrid, self.config.publish.clone(), reader, committer)
    }

    fn schedule_into(
        &self,
        tx: &mut PublishTransaction,
        source: UploadSource,
        destination: &str,
        overwrite: bool,
    ) -> Result<Scheduled> {
        let target = self.store_path(tx.store_root(), destination)?;
        let upload = PendingUpload::new(source, &target, overwrite, &self.ephemeral)?;
        tx.schedule(upload)
    }

    pub fn commit_publish_transaction(&mut self) -> Result<PublishOutcome> {
        let Some(tx) = self.transaction.as_mut() else {
            info!("nothing scheduled; no commit needed");
            self.module = None;
            return Ok(PublishOutcome::default());
        };
        let outcome = tx.commit()?;
        self.transaction = None;
        self.module = None;
        Ok(outcome)
    }

    /// Discard the current publish. A no-op when nothing was scheduled or
    /// the commit never started.
    pub fn abort_publish_transaction(&mut self) -> Result<()> {
        self.module = None;
        match self.transaction.take() {
            None => {
                debug!("no publish transaction to abort");
                Ok(())
            }
            Some(tx) if !tx.has_commit_started() => {
                debug!(module = %tx.module(), "commit never started; discarding scheduled uploads");
                Ok(())
            }
            Some(mut tx) => tx.abort(),
        }
    }

    /// Copy the file at `source` into `out`.
    pub fn get(&self, source: &str, out: &mut dyn Write) -> Result<u64> {
        let conn = self.connection()?;
        let store = lock_store(&conn);
        let target = self.store_path(store.repository_root(), source)?;
        dao::fetch_file(&**store, &target, out, self.read_revision())
    }

    /// Names of the direct children of `folder`; empty when it does not exist.
    pub fn list(&self, folder: &str) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let store = lock_store(&conn);
        let target = self.store_path(store.repository_root(), folder)?;
        Ok(dao::list_names(&**store, &target, self.read_revision())?
            .into_iter()
            .collect())
    }

    /// The newest `limit` revisions of the store, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.connection()?;
        let store = lock_store(&conn);
        store.log(limit)
    }

    /// Lookup failures resolve to a missing resource.
    pub fn resolve_resource(&self, location: &str) -> Resource {
        match self.try_resolve(location) {
            Ok(Some(resource)) => resource,
            Ok(None) => Resource::missing(location),
            Err(e) => {
                warn!(path = %location, error = %e, "resource lookup failed");
                Resource::missing(location)
            }
        }
    }

    fn try_resolve(&self, location: &str) -> Result<Option<Resource>> {
        let conn = self.connection()?;
        let store = lock_store(&conn);
        let target = self.store_path(store.repository_root(), location)?;
        let entry = store.info(&target, self.read_revision())?;
        Ok(entry.map(|e| Resource {
            path: location.to_string(),
            exists: true,
            kind: e.kind,
            size: e.size,
            last_modified: e.date,
        }))
    }
}
