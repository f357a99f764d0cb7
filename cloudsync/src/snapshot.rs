//! Normalized in-memory views of a project's content.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;

/// Name → exact content. Ordered so that diffs and plans are deterministic.
pub type ContentMap = BTreeMap<String, Bytes>;

/// Files and (v1) models of a single class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassContent {
    pub files: ContentMap,
    pub models: ContentMap,
}

/// A dependency bundle, identified by its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyBundle {
    pub hash: String,
    /// Local folder the bundle is zipped from. Remote bundles have none.
    pub source: Option<PathBuf>,
}

/// One side (local or remote) of a project at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    pub files: ContentMap,
    pub models: ContentMap,
    pub dependencies: BTreeMap<String, DependencyBundle>,
    pub classes: BTreeMap<String, ClassContent>,
}

impl ProjectSnapshot {
    pub fn class(&self, name: &str) -> Option<&ClassContent> {
        self.classes.get(name)
    }
}
