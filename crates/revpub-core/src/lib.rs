pub mod alias;
pub mod config;
pub mod connection_cache;
pub mod cursor;
pub mod dao;
pub mod path_tree;
pub mod pattern;
pub mod repository;
pub mod transaction;
pub mod upload;

pub use revpub_types::error;

pub use connection_cache::ConnectionCache;
pub use repository::{ArtifactRepository, Resource};
pub use transaction::{PublishOutcome, PublishTransaction, Scheduled};
pub use upload::{EphemeralPolicy, PendingUpload, UploadSource};

#[cfg(test)]
mod testutil;
