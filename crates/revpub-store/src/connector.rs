use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use revpub_types::error::{Result, RevpubError};

use crate::url::StoreUrl;
use crate::versioned::TreeStore;
use crate::{Connector, RemoteStore};

/// Named in-process stores addressed by `mem://<name>` URLs.
#[derive(Default)]
pub struct MemoryRegistry {
    stores: Mutex<HashMap<String, Arc<TreeStore>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store called `name`, created empty on first use.
    pub fn get_or_create(&self, name: &str) -> Arc<TreeStore> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(stores.entry(name.to_string()).or_insert_with(|| {
            debug!(name, "created in-memory store");
            TreeStore::in_memory(StoreUrl {
                scheme: "mem".into(),
                host: name.to_string(),
                path: String::new(),
            })
        }))
    }
}

/// Connects `mem://` and `file://` URLs to [`TreeStore`] sessions.
pub struct StoreConnector {
    registry: Arc<MemoryRegistry>,
    author: Option<String>,
}

impl StoreConnector {
    pub fn new(registry: Arc<MemoryRegistry>, author: Option<String>) -> Self {
        Self { registry, author }
    }
}

impl Connector for StoreConnector {
    fn connect(&self, url: &StoreUrl) -> Result<Box<dyn RemoteStore>> {
        let store = match url.scheme.as_str() {
            "mem" => self.registry.get_or_create(&url.host),
            "file" => {
                if !url.host.is_empty() && url.host != "localhost" {
                    return Err(RevpubError::UnsupportedScheme(format!(
                        "file URL with remote host '{}'",
                        url.host
                    )));
                }
                TreeStore::locate_local(&url.to_file_path())?
            }
            other => return Err(RevpubError::UnsupportedScheme(other.to_string())),
        };
        debug!(url = %url, root = %store.root_url(), "connected");
        Ok(Box::new(store.session(self.author.clone())))
    }
}
