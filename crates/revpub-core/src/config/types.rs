use serde::Deserialize;

use revpub_types::error::{Result, RevpubError};

use super::defaults::*;

/// Where the artifacts live and how reads are pinned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Store URL: `file:///abs/path` or `mem://<name>[/path]`.
    pub url: String,
    /// Recorded as the author of publish commits.
    #[serde(default)]
    pub username: Option<String>,
    /// Pins `get`/`list`/`info` to a revision instead of the head.
    #[serde(default)]
    pub retrieve_revision: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Also publish every batch to an alias folder (e.g. `LATEST`).
    #[serde(default)]
    pub alias: bool,
    #[serde(default = "default_alias_folder")]
    pub alias_folder: String,
    /// Remove entries left over from earlier publishes to the same folder.
    #[serde(default)]
    pub cleanup_publish_folder: bool,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Source files whose name starts with this prefix are read when
    /// scheduled rather than at commit.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            alias: false,
            alias_folder: default_alias_folder(),
            cleanup_publish_folder: false,
            pattern: default_pattern(),
            temp_prefix: default_temp_prefix(),
        }
    }
}

impl PublishConfig {
    pub fn validate(&self) -> Result<()> {
        if self.alias && !self.cleanup_publish_folder {
            return Err(RevpubError::Config(
                "publish.alias requires publish.cleanup_publish_folder: true".into(),
            ));
        }
        if self.alias_folder.is_empty() {
            return Err(RevpubError::Config(
                "publish.alias_folder must not be empty".into(),
            ));
        }
        if self.alias_folder.contains('/') {
            return Err(RevpubError::Config(format!(
                "publish.alias_folder must be a single folder name, got '{}'",
                self.alias_folder
            )));
        }
        if self.pattern.is_empty() {
            return Err(RevpubError::Config("publish.pattern must not be empty".into()));
        }
        Ok(())
    }

    /// Alias folder name when alias mode is on.
    pub fn alias_folder(&self) -> Option<&str> {
        self.alias.then_some(self.alias_folder.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevpubConfig {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl RevpubConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repository.url.is_empty() {
            return Err(RevpubError::Config("repository.url must not be empty".into()));
        }
        self.publish.validate()
    }
}
