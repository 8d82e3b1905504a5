use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use revpub_store::{Connector, RemoteStore, StoreUrl};
use revpub_types::error::Result;

/// A cached session. Sessions are not meant for concurrent use; holders
/// lock it for the duration of each operation.
pub type SharedStore = Arc<Mutex<Box<dyn RemoteStore>>>;

/// Lock a shared session, recovering from a poisoned lock.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, Box<dyn RemoteStore>> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sessions keyed by `scheme:host`, shared by every repository handle
/// constructed with the same cache.
///
/// A single mutex covers lookup-or-connect, so concurrent callers asking
/// for the same destination connect once. Each entry keeps its store root
/// so lookups never wait on a session in use.
#[derive(Default)]
pub struct ConnectionCache {
    connections: Mutex<HashMap<String, CachedConnection>>,
}

struct CachedConnection {
    root: StoreUrl,
    store: SharedStore,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached session for `url`'s destination, connecting on first use.
    /// A cached session whose store does not contain `url` is replaced.
    pub fn get_or_connect(&self, connector: &dyn Connector, url: &StoreUrl) -> Result<SharedStore> {
        let key = url.connection_key();
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = connections.get(&key) {
            if url.relative_to(&existing.root).is_some() {
                debug!(key = %key, "reusing cached connection");
                return Ok(Arc::clone(&existing.store));
            }
            debug!(key = %key, url = %url, "cached connection is for another store; reconnecting");
        }
        let store = connector.connect(url)?;
        let root = store.repository_root().clone();
        debug!(key = %key, root = %root, "opened connection");
        let shared = Arc::new(Mutex::new(store));
        connections.insert(
            key,
            CachedConnection {
                root,
                store: Arc::clone(&shared),
            },
        );
        Ok(shared)
    }

    pub fn len(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
