//! Content fetchers: read a project's current contents from disk or from the
//! platform, normalized into a [`crate::snapshot::ProjectSnapshot`].

pub mod local;
pub mod remote;

use std::collections::BTreeSet;

use crate::utils::{Result, SyncError};

pub use local::fetch_local;
pub use remote::fetch_remote;

/// Which classes a run operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ClassSelection {
    /// Parse the `--classes` filter. Values may be repeated or comma-separated.
    pub fn parse(raw: &[String]) -> Result<Self> {
        if raw.is_empty() {
            return Ok(ClassSelection::All);
        }

        let mut names = BTreeSet::new();
        for value in raw {
            for name in value.split(',') {
                let name = name.trim();
                if name.is_empty() {
                    return Err(SyncError::Validation(format!(
                        "empty class name in --classes filter {value:?}"
                    )));
                }
                if name.contains(['/', '\\']) || name == "." || name == ".." {
                    return Err(SyncError::Validation(format!(
                        "class name {name:?} must be a plain folder name"
                    )));
                }
                names.insert(name.to_string());
            }
        }
        Ok(ClassSelection::Only(names))
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            ClassSelection::All => true,
            ClassSelection::Only(names) => names.contains(name),
        }
    }

    /// Human-readable form for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            ClassSelection::All => "all classes".to_string(),
            ClassSelection::Only(names) => names.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}
