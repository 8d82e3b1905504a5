use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::debug;

use revpub_types::error::{Result, RevpubError};
use revpub_types::path;

/// Where an upload's bytes come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Decides which source files may disappear before commit and therefore
/// must be read when the upload is scheduled.
#[derive(Debug, Clone)]
pub struct EphemeralPolicy {
    pub temp_dir: PathBuf,
    pub prefix: String,
}

impl EphemeralPolicy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            prefix: prefix.into(),
        }
    }

    pub fn is_ephemeral(&self, file: &Path) -> bool {
        let named_temp = file
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| !self.prefix.is_empty() && n.starts_with(&self.prefix));
        named_temp || file.starts_with(&self.temp_dir)
    }
}

/// One file destined for the store.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    source: UploadSource,
    folder: String,
    file_name: String,
    overwrite: bool,
}

impl PendingUpload {
    /// `destination` is a root-relative file path; a trailing separator
    /// is rejected.
    pub fn new(
        source: UploadSource,
        destination: &str,
        overwrite: bool,
        policy: &EphemeralPolicy,
    ) -> Result<Self> {
        let (folder, file_name) = path::split_file(destination)?;
        let source = match source {
            UploadSource::File(file) if policy.is_ephemeral(&file) => {
                debug!(file = %file.display(), "loading ephemeral source eagerly");
                UploadSource::Bytes(read_source(&file)?)
            }
            other => other,
        };
        Ok(Self {
            source,
            folder,
            file_name,
            overwrite,
        })
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>, destination: &str, overwrite: bool) -> Result<Self> {
        let (folder, file_name) = path::split_file(destination)?;
        Ok(Self {
            source: UploadSource::Bytes(data.into()),
            folder,
            file_name,
            overwrite,
        })
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn destination(&self) -> String {
        path::join(&self.folder, &self.file_name)
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        matches!(self.source, UploadSource::Bytes(_))
    }

    /// Content to upload. Lazy file sources are read on each call.
    pub fn data(&self) -> Result<Cow<'_, [u8]>> {
        match &self.source {
            UploadSource::Bytes(data) => Ok(Cow::Borrowed(data)),
            UploadSource::File(file) => Ok(Cow::Owned(read_source(file)?)),
        }
    }
}

fn read_source(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).map_err(|e| {
        RevpubError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read upload source '{}': {e}", file.display()),
        ))
    })
}

/// A scheduled upload with the folder and overwrite flag actually used
/// for the commit. In alias mode these differ from the upload's own
/// permanent folder and requested flag.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub upload: PendingUpload,
    pub folder: String,
    pub overwrite: bool,
}

impl StagedUpload {
    pub fn direct(upload: PendingUpload) -> Self {
        Self {
            folder: upload.folder.clone(),
            overwrite: upload.overwrite,
            upload,
        }
    }

    pub fn destination(&self) -> String {
        path::join(&self.folder, &self.upload.file_name)
    }
}
