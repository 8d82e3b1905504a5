pub mod checksum;
pub mod error;
pub mod module_id;
pub mod path;
pub mod revision;

pub use checksum::ContentHash;
pub use error::{Result, RevpubError};
pub use module_id::ModuleRevisionId;
pub use revision::{NodeKind, Revision};
