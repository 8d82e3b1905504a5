//! Alias ("latest pointer") folder derivation and preparation.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use revpub_types::error::{Result, RevpubError};

use crate::cursor::CommitCursor;
use crate::dao::RemoteStoreClient;
use crate::upload::StagedUpload;

/// Replace the single occurrence of `revision` in `folder` with `alias`.
///
/// Occurrences are counted literally and without overlap on the input
/// path. Anything but exactly one is ambiguous.
pub fn alias_folder_path(folder: &str, revision: &str, alias: &str) -> Result<String> {
    let occurrences = if revision.is_empty() {
        0
    } else {
        folder.matches(revision).count()
    };
    if occurrences != 1 {
        return Err(RevpubError::AmbiguousRevisionPath {
            folder: folder.to_string(),
            revision: revision.to_string(),
        });
    }
    Ok(folder.replacen(revision, alias, 1))
}

/// Build the permanent-to-staging mapping for the copy commit and clear
/// permanent folders that will be replaced.
///
/// Runs inside the primary commit. Each permanent folder is decided once,
/// by the first upload seen for it: an existing folder is deleted when that
/// upload asked to overwrite, and dropped from the mapping otherwise.
pub fn prepare_alias<'a>(
    dao: &mut RemoteStoreClient,
    cursor: &mut CommitCursor,
    uploads: impl IntoIterator<Item = &'a StagedUpload>,
) -> Result<BTreeMap<String, String>> {
    let mut processed = HashSet::new();
    let mut mapping = BTreeMap::new();
    for staged in uploads {
        let permanent = staged.upload.folder();
        if !processed.insert(permanent.to_string()) {
            continue;
        }
        if permanent == staged.folder {
            debug!(path = %permanent, "alias folder is the permanent folder; nothing to copy");
            continue;
        }
        mapping.insert(permanent.to_string(), staged.folder.clone());
        if dao.folder_exists(permanent, true)? {
            if staged.upload.overwrite() {
                info!(path = %permanent, "replacing existing folder from alias copy");
                dao.delete_entry(cursor, permanent)?;
            } else {
                info!(path = %permanent, "folder exists and overwrite is off; alias copy skipped");
                mapping.remove(permanent);
            }
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_segment_is_replaced() {
        assert_eq!(
            alias_folder_path("org/mod/1.0", "1.0", "LATEST").unwrap(),
            "org/mod/LATEST"
        );
    }

    #[test]
    fn duplicated_revision_is_ambiguous() {
        let err = alias_folder_path("org/mod/1.0/1.0", "1.0", "LATEST").unwrap_err();
        assert!(matches!(
            err,
            RevpubError::AmbiguousRevisionPath { ref folder, ref revision }
                if folder == "org/mod/1.0/1.0" && revision == "1.0"
        ));
    }

    #[test]
    fn missing_revision_is_ambiguous() {
        assert!(alias_folder_path("org/mod/2.0", "1.0", "LATEST").is_err());
        assert!(alias_folder_path("org/mod/2.0", "", "LATEST").is_err());
    }

    #[test]
    fn single_occurrence_inside_segment_text_is_replaced() {
        assert_eq!(
            alias_folder_path("org/test/1.0", "test", "LATEST").unwrap(),
            "org/LATEST/1.0"
        );
    }

    #[test]
    fn revision_also_inside_unrelated_segment_is_ambiguous() {
        assert!(alias_folder_path("org/testing/test", "test", "LATEST").is_err());
        assert!(alias_folder_path("org/mod-1.0-tools/1.0", "1.0", "LATEST").is_err());
    }

    #[test]
    fn replacement_containing_revision_is_accepted() {
        assert_eq!(
            alias_folder_path("org/mod/TEST", "TEST", "LATEST").unwrap(),
            "org/mod/LATEST"
        );
    }
}
