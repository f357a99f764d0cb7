//! Flattening a comparison into typed units of work.

use bytes::Bytes;

use super::summary::{Comparison, EntryChanges};
use crate::snapshot::{ClassContent, ContentMap, ProjectSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationKind {
    Dependency,
    Model,
    ProjectFile,
    Class,
    ClassFile,
    ClassModel,
}

/// `None` marks an item included without a detected difference (forced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Created,
    Edited,
    Deleted,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOperationItem {
    pub kind: OperationKind,
    pub status: OperationStatus,
    /// Owning class for class files and class models.
    pub class: Option<String>,
    /// Item key: a bundle, model, file or class name.
    pub path: String,
    pub old_content: Option<Bytes>,
    pub new_content: Option<Bytes>,
    pub hash: Option<String>,
}

impl DeploymentOperationItem {
    fn new(kind: OperationKind, status: OperationStatus, path: &str) -> Self {
        Self {
            kind,
            status,
            class: None,
            path: path.to_string(),
            old_content: None,
            new_content: None,
            hash: None,
        }
    }

    fn with_contents(mut self, local: &ContentMap, remote: &ContentMap) -> Self {
        self.new_content = local.get(&self.path).cloned();
        self.old_content = remote.get(&self.path).cloned();
        self
    }

    /// `class/path` for class entries, the bare path otherwise. Used in plan logs.
    pub fn label(&self) -> String {
        match &self.class {
            Some(class) => format!("{class}/{}", self.path),
            None => self.path.clone(),
        }
    }
}

fn entry_status(changes: &EntryChanges) -> OperationStatus {
    if changes.created {
        OperationStatus::Created
    } else if changes.edited {
        OperationStatus::Edited
    } else if changes.deleted {
        OperationStatus::Deleted
    } else {
        OperationStatus::None
    }
}

fn class_items(
    kind: OperationKind,
    class: &str,
    lists: [(&[String], OperationStatus); 4],
    local: &ContentMap,
    remote: &ContentMap,
) -> Vec<DeploymentOperationItem> {
    let mut items: Vec<DeploymentOperationItem> = lists
        .into_iter()
        .flat_map(|(names, status)| {
            names.iter().map(move |name| {
                let mut item = DeploymentOperationItem::new(kind, status, name)
                    .with_contents(local, remote);
                item.class = Some(class.to_string());
                item
            })
        })
        .collect();
    items.sort_by(|a, b| a.path.cmp(&b.path));
    items
}

/// Flatten a comparison into items ordered by kind, then class, then path.
pub fn operations(
    comparison: &Comparison,
    local: &ProjectSnapshot,
    remote: &ProjectSnapshot,
) -> Vec<DeploymentOperationItem> {
    let summary = &comparison.summary;
    let mut items = Vec::new();

    for (name, changes) in &summary.dependencies {
        let status = if changes.new {
            OperationStatus::Created
        } else if changes.edited {
            OperationStatus::Edited
        } else if changes.deleted {
            OperationStatus::Deleted
        } else {
            OperationStatus::None
        };
        let mut item = DeploymentOperationItem::new(OperationKind::Dependency, status, name);
        item.hash = local
            .dependencies
            .get(name)
            .or_else(|| remote.dependencies.get(name))
            .map(|bundle| bundle.hash.clone());
        items.push(item);
    }

    for (name, changes) in &summary.models {
        items.push(
            DeploymentOperationItem::new(OperationKind::Model, entry_status(changes), name)
                .with_contents(&local.models, &remote.models),
        );
    }

    for (name, changes) in &summary.files {
        items.push(
            DeploymentOperationItem::new(OperationKind::ProjectFile, entry_status(changes), name)
                .with_contents(&local.files, &remote.files),
        );
    }

    for (name, changes) in &summary.classes {
        let status = if changes.new_class {
            OperationStatus::Created
        } else if changes.deleted_class {
            OperationStatus::Deleted
        } else {
            OperationStatus::None
        };
        items.push(DeploymentOperationItem::new(OperationKind::Class, status, name));
    }

    let empty = ClassContent::default();
    for (name, changes) in &summary.classes {
        let ours = local.class(name).unwrap_or(&empty);
        let theirs = remote.class(name).unwrap_or(&empty);
        items.extend(class_items(
            OperationKind::ClassFile,
            name,
            [
                (changes.created_files.as_slice(), OperationStatus::Created),
                (changes.edited_files.as_slice(), OperationStatus::Edited),
                (changes.deleted_files.as_slice(), OperationStatus::Deleted),
                (changes.forced_files.as_slice(), OperationStatus::None),
            ],
            &ours.files,
            &theirs.files,
        ));
    }

    for (name, changes) in &summary.classes {
        let ours = local.class(name).unwrap_or(&empty);
        let theirs = remote.class(name).unwrap_or(&empty);
        items.extend(class_items(
            OperationKind::ClassModel,
            name,
            [
                (changes.created_models.as_slice(), OperationStatus::Created),
                (changes.edited_models.as_slice(), OperationStatus::Edited),
                (changes.deleted_models.as_slice(), OperationStatus::Deleted),
                (changes.forced_models.as_slice(), OperationStatus::None),
            ],
            &ours.models,
            &theirs.models,
        ));
    }

    items
}
