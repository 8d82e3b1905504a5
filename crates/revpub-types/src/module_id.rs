use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RevpubError;

/// Identity of the module revision being published, rendered as
/// `organisation#name;revision`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleRevisionId {
    pub organisation: String,
    pub name: String,
    pub revision: String,
}

impl ModuleRevisionId {
    pub fn new(
        organisation: impl Into<String>,
        name: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            organisation: organisation.into(),
            name: name.into(),
            revision: revision.into(),
        }
    }
}

impl fmt::Display for ModuleRevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{};{}", self.organisation, self.name, self.revision)
    }
}

impl FromStr for ModuleRevisionId {
    type Err = RevpubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            RevpubError::Other(format!(
                "invalid module revision '{s}': expected organisation#name;revision"
            ))
        };
        let (organisation, rest) = s.split_once('#').ok_or_else(invalid)?;
        let (name, revision) = rest.split_once(';').ok_or_else(invalid)?;
        if organisation.is_empty() || name.is_empty() || revision.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(organisation, name, revision))
    }
}
