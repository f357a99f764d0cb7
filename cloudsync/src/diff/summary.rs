//! Comparison result types.
//!
//! An entity is present in a summary only when something about it changed;
//! absence means "unchanged".

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-class change lists, each holding item names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassChanges {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edited_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forced_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_models: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edited_models: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted_models: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forced_models: Vec<String>,
    /// The platform has no record of this class.
    pub new_class: bool,
    /// The class exists only remotely. Never propagated.
    #[serde(skip_serializing_if = "is_false")]
    pub deleted_class: bool,
}

impl ClassChanges {
    pub fn has_item_changes(&self) -> bool {
        [
            &self.created_files,
            &self.edited_files,
            &self.deleted_files,
            &self.forced_files,
            &self.created_models,
            &self.edited_models,
            &self.deleted_models,
            &self.forced_models,
        ]
        .iter()
        .any(|list| !list.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_item_changes() && !self.new_class && !self.deleted_class
    }
}

/// Dependency bundle change flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyChanges {
    #[serde(skip_serializing_if = "is_false")]
    pub new: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub edited: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub forced: bool,
    /// Present only remotely. Never propagated.
    #[serde(skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl DependencyChanges {
    pub fn is_empty(&self) -> bool {
        !(self.new || self.edited || self.forced || self.deleted)
    }
}

/// Change flags for project-level models and files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryChanges {
    #[serde(skip_serializing_if = "is_false")]
    pub created: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub edited: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub forced: bool,
}

impl EntryChanges {
    pub fn is_empty(&self) -> bool {
        !(self.created || self.edited || self.deleted || self.forced)
    }
}

/// Immutable result of diffing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub classes: BTreeMap<String, ClassChanges>,
    pub dependencies: BTreeMap<String, DependencyChanges>,
    pub models: BTreeMap<String, EntryChanges>,
    pub files: BTreeMap<String, EntryChanges>,
}

impl ComparisonSummary {
    /// Number of changed entities across all four collections.
    pub fn entity_count(&self) -> usize {
        self.classes.len() + self.dependencies.len() + self.models.len() + self.files.len()
    }
}

/// What the orchestrator should act on, kept apart from the summary so the
/// diff output is never mutated after the fact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployDecisions {
    /// Bundles whose zipped bytes must be uploaded.
    pub upload_dependencies: BTreeSet<String>,
    /// Classes with items to save.
    pub save_classes: BTreeSet<String>,
    /// Classes the platform must create before anything is saved.
    pub create_classes: BTreeSet<String>,
}

/// A summary together with the decisions derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub summary: ComparisonSummary,
    pub decisions: DeployDecisions,
}
