//! Diff engine.
//!
//! One engine serves both project generations; schema differences are
//! already folded into the snapshots by the fetchers. Every collection is
//! compared with the same rule:
//!
//! | local | remote | skip_diff | result    |
//! |-------|--------|-----------|-----------|
//! | yes   | no     | any       | created   |
//! | yes   | yes    | true      | forced    |
//! | yes   | differs| false     | edited    |
//! | yes   | equal  | false     | (omitted) |
//! | no    | yes    | any       | deleted   |

pub mod operations;
pub mod summary;

use std::collections::BTreeMap;

use crate::schema::EntitySchema;
use crate::snapshot::{ClassContent, ContentMap, DependencyBundle, ProjectSnapshot};

pub use operations::{operations, DeploymentOperationItem, OperationKind, OperationStatus};
pub use summary::{
    ClassChanges, Comparison, ComparisonSummary, DependencyChanges, DeployDecisions,
    EntryChanges,
};

/// Per-key classification of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionDiff {
    pub created: Vec<String>,
    pub edited: Vec<String>,
    pub deleted: Vec<String>,
    pub forced: Vec<String>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.edited.is_empty()
            && self.deleted.is_empty()
            && self.forced.is_empty()
    }
}

/// Compare two keyed collections using `same` for content equality.
pub fn diff_collection<V, F>(
    local: &BTreeMap<String, V>,
    remote: &BTreeMap<String, V>,
    skip_diff: bool,
    same: F,
) -> CollectionDiff
where
    F: Fn(&V, &V) -> bool,
{
    let mut diff = CollectionDiff::default();

    for (key, value) in local {
        match remote.get(key) {
            None => diff.created.push(key.clone()),
            Some(_) if skip_diff => diff.forced.push(key.clone()),
            Some(theirs) if !same(value, theirs) => diff.edited.push(key.clone()),
            Some(_) => {}
        }
    }

    diff.deleted = remote
        .keys()
        .filter(|key| !local.contains_key(*key))
        .cloned()
        .collect();

    diff
}

fn diff_contents(local: &ContentMap, remote: &ContentMap, skip_diff: bool) -> CollectionDiff {
    diff_collection(local, remote, skip_diff, |a, b| a == b)
}

/// Compare a local snapshot against the remote one.
///
/// Project files outside the schema's list are ignored on both sides.
pub fn diff(
    local: &ProjectSnapshot,
    remote: &ProjectSnapshot,
    schema: &EntitySchema,
    skip_diff: bool,
) -> Comparison {
    let mut comparison = Comparison::default();

    diff_classes(local, remote, skip_diff, &mut comparison);
    diff_dependencies(
        &local.dependencies,
        &remote.dependencies,
        skip_diff,
        &mut comparison,
    );

    comparison.summary.models = entry_changes(diff_contents(&local.models, &remote.models, skip_diff));
    comparison.summary.files = entry_changes(diff_contents(
        &project_files(&local.files, schema),
        &project_files(&remote.files, schema),
        skip_diff,
    ));

    comparison
}

fn project_files(files: &ContentMap, schema: &EntitySchema) -> ContentMap {
    files
        .iter()
        .filter(|(name, _)| schema.project_files.contains(&name.as_str()))
        .map(|(name, content)| (name.clone(), content.clone()))
        .collect()
}

fn diff_classes(
    local: &ProjectSnapshot,
    remote: &ProjectSnapshot,
    skip_diff: bool,
    comparison: &mut Comparison,
) {
    let empty = ClassContent::default();

    for (name, ours) in &local.classes {
        let theirs = remote.classes.get(name);
        let new_class = theirs.is_none();
        let theirs = theirs.unwrap_or(&empty);

        let files = diff_contents(&ours.files, &theirs.files, skip_diff);
        let models = diff_contents(&ours.models, &theirs.models, skip_diff);

        let changes = ClassChanges {
            created_files: files.created,
            edited_files: files.edited,
            deleted_files: files.deleted,
            forced_files: files.forced,
            created_models: models.created,
            edited_models: models.edited,
            deleted_models: models.deleted,
            forced_models: models.forced,
            new_class,
            deleted_class: false,
        };

        if new_class {
            comparison.decisions.create_classes.insert(name.clone());
        }
        if changes.has_item_changes() {
            comparison.decisions.save_classes.insert(name.clone());
        }
        if !changes.is_empty() {
            comparison.summary.classes.insert(name.clone(), changes);
        }
    }

    for (name, theirs) in &remote.classes {
        if local.classes.contains_key(name) {
            continue;
        }
        comparison.summary.classes.insert(
            name.clone(),
            ClassChanges {
                deleted_files: theirs.files.keys().cloned().collect(),
                deleted_models: theirs.models.keys().cloned().collect(),
                deleted_class: true,
                ..ClassChanges::default()
            },
        );
    }
}

fn diff_dependencies(
    local: &BTreeMap<String, DependencyBundle>,
    remote: &BTreeMap<String, DependencyBundle>,
    skip_diff: bool,
    comparison: &mut Comparison,
) {
    let diff = diff_collection(local, remote, skip_diff, |a, b| a.hash == b.hash);
    let deps = &mut comparison.summary.dependencies;

    for name in &diff.created {
        deps.entry(name.clone()).or_default().new = true;
    }
    for name in &diff.edited {
        deps.entry(name.clone()).or_default().edited = true;
    }
    for name in &diff.forced {
        deps.entry(name.clone()).or_default().forced = true;
    }
    for name in &diff.deleted {
        deps.entry(name.clone()).or_default().deleted = true;
    }

    comparison
        .decisions
        .upload_dependencies
        .extend(diff.created.into_iter().chain(diff.edited).chain(diff.forced));
}

fn entry_changes(diff: CollectionDiff) -> BTreeMap<String, EntryChanges> {
    let mut entries: BTreeMap<String, EntryChanges> = BTreeMap::new();
    for name in diff.created {
        entries.entry(name).or_default().created = true;
    }
    for name in diff.edited {
        entries.entry(name).or_default().edited = true;
    }
    for name in diff.deleted {
        entries.entry(name).or_default().deleted = true;
    }
    for name in diff.forced {
        entries.entry(name).or_default().forced = true;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{V1, V2};
    use bytes::Bytes;

    fn content(pairs: &[(&str, &str)]) -> ContentMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Bytes::from(v.to_string())))
            .collect()
    }

    fn class(files: &[(&str, &str)]) -> ClassContent {
        ClassContent {
            files: content(files),
            models: ContentMap::new(),
        }
    }

    fn bundle(hash: &str) -> DependencyBundle {
        DependencyBundle {
            hash: hash.to_string(),
            source: None,
        }
    }

    fn sample() -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::default();
        snapshot
            .classes
            .insert("Foo".into(), class(&[("index.js", "v1"), ("util.js", "u")]));
        snapshot.models = content(&[("A", "{\"type\":\"object\"}")]);
        snapshot.files = content(&[("package.json", "{}")]);
        snapshot.dependencies.insert("utils".into(), bundle("h1"));
        snapshot
    }

    #[test]
    fn identical_snapshots_produce_empty_summary_every_time() {
        let snapshot = sample();
        for _ in 0..2 {
            let comparison = diff(&snapshot, &snapshot.clone(), &V2, false);
            assert_eq!(comparison, Comparison::default());
        }
    }

    #[test]
    fn edited_class_file_is_listed() {
        let remote = sample();
        let mut local = sample();
        local
            .classes
            .get_mut("Foo")
            .unwrap()
            .files
            .insert("index.js".into(), Bytes::from_static(b"v2"));

        let comparison = diff(&local, &remote, &V2, false);
        let foo = &comparison.summary.classes["Foo"];
        assert_eq!(foo.edited_files, vec!["index.js"]);
        assert!(foo.created_files.is_empty() && foo.deleted_files.is_empty());
        assert!(!foo.new_class);
        assert!(comparison.decisions.save_classes.contains("Foo"));
        assert_eq!(comparison.summary.entity_count(), 1);
    }

    #[test]
    fn whitespace_and_line_endings_are_differences() {
        let remote = sample();
        let mut local = sample();
        local
            .classes
            .get_mut("Foo")
            .unwrap()
            .files
            .insert("index.js".into(), Bytes::from_static(b"v1\r\n"));

        let comparison = diff(&local, &remote, &V2, false);
        assert_eq!(comparison.summary.classes["Foo"].edited_files, vec!["index.js"]);
    }

    #[test]
    fn new_class_lists_every_file_as_created() {
        let remote = ProjectSnapshot::default();
        let mut local = ProjectSnapshot::default();
        local
            .classes
            .insert("Foo".into(), class(&[("a.js", "a"), ("b.js", "b")]));

        let comparison = diff(&local, &remote, &V2, false);
        let foo = &comparison.summary.classes["Foo"];
        assert!(foo.new_class);
        assert_eq!(foo.created_files, vec!["a.js", "b.js"]);
        assert!(comparison.decisions.create_classes.contains("Foo"));
    }

    #[test]
    fn empty_new_class_still_appears() {
        let mut local = ProjectSnapshot::default();
        local.classes.insert("Empty".into(), ClassContent::default());

        let comparison = diff(&local, &ProjectSnapshot::default(), &V2, false);
        assert!(comparison.summary.classes["Empty"].new_class);
        assert!(!comparison.decisions.save_classes.contains("Empty"));
    }

    #[test]
    fn skip_diff_forces_every_local_key() {
        let local = sample();
        let remote = sample();

        let comparison = diff(&local, &remote, &V2, true);
        let summary = &comparison.summary;
        assert_eq!(summary.classes["Foo"].forced_files, vec!["index.js", "util.js"]);
        assert!(summary.models["A"].forced);
        assert!(summary.files["package.json"].forced);
        assert!(summary.dependencies["utils"].forced);
        assert!(comparison.decisions.upload_dependencies.contains("utils"));
        assert!(comparison.decisions.save_classes.contains("Foo"));
    }

    #[test]
    fn skip_diff_does_not_force_remote_only_keys() {
        let mut local = sample();
        local.models.clear();
        let remote = sample();

        let comparison = diff(&local, &remote, &V2, true);
        assert_eq!(
            comparison.summary.models["A"],
            EntryChanges {
                deleted: true,
                ..EntryChanges::default()
            }
        );
    }

    #[test]
    fn skip_diff_on_brand_new_entities_reports_created() {
        let local = sample();
        let comparison = diff(&local, &ProjectSnapshot::default(), &V2, true);
        assert!(comparison.summary.classes["Foo"].new_class);
        assert_eq!(
            comparison.summary.classes["Foo"].created_files,
            vec!["index.js", "util.js"]
        );
        assert!(comparison.summary.dependencies["utils"].new);
        assert!(comparison.summary.models["A"].created);
    }

    #[test]
    fn dependencies_compare_by_hash_only() {
        let remote = sample();
        let mut local = sample();
        local.dependencies.insert(
            "utils".into(),
            DependencyBundle {
                hash: "h1".into(),
                source: Some("/somewhere/else".into()),
            },
        );
        assert!(diff(&local, &remote, &V2, false).summary.dependencies.is_empty());

        local.dependencies.insert("utils".into(), bundle("h2"));
        local.dependencies.insert("extra".into(), bundle("h3"));
        let comparison = diff(&local, &remote, &V2, false);
        assert!(comparison.summary.dependencies["utils"].edited);
        assert!(comparison.summary.dependencies["extra"].new);
        assert_eq!(
            comparison
                .decisions
                .upload_dependencies
                .iter()
                .collect::<Vec<_>>(),
            vec!["extra", "utils"]
        );
    }

    #[test]
    fn remote_only_class_and_dependency_are_deleted() {
        let remote = sample();
        let local = ProjectSnapshot::default();

        let comparison = diff(&local, &remote, &V2, false);
        let foo = &comparison.summary.classes["Foo"];
        assert!(foo.deleted_class);
        assert_eq!(foo.deleted_files, vec!["index.js", "util.js"]);
        assert!(comparison.summary.dependencies["utils"].deleted);
        assert!(comparison.decisions.upload_dependencies.is_empty());
        assert!(comparison.decisions.save_classes.is_empty());
    }

    #[test]
    fn new_project_model_is_created() {
        let mut local = ProjectSnapshot::default();
        local.models = content(&[("A", "{\"type\":\"object\"}")]);

        let comparison = diff(&local, &ProjectSnapshot::default(), &V2, false);
        assert_eq!(
            comparison.summary.models["A"],
            EntryChanges {
                created: true,
                ..EntryChanges::default()
            }
        );
    }

    #[test]
    fn project_files_follow_the_schema() {
        let local = sample();
        let comparison = diff(&local, &ProjectSnapshot::default(), &V1, false);
        assert!(comparison.summary.files.is_empty());

        let mut local = ProjectSnapshot::default();
        local.files = content(&[("package.json", "{}"), ("README.md", "hi")]);
        let files = diff(&local, &ProjectSnapshot::default(), &V2, false).summary.files;
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["package.json"]);
    }

    #[test]
    fn class_models_diff_like_files() {
        let mut remote = ProjectSnapshot::default();
        let mut theirs = class(&[("index.js", "x")]);
        theirs.models = content(&[("User.json", "{}"), ("Old.json", "{}")]);
        remote.classes.insert("Foo".into(), theirs);

        let mut local = ProjectSnapshot::default();
        let mut ours = class(&[("index.js", "x")]);
        ours.models = content(&[("User.json", "{\"a\":1}"), ("New.json", "{}")]);
        local.classes.insert("Foo".into(), ours);

        let foo = diff(&local, &remote, &V2, false).summary.classes["Foo"].clone();
        assert_eq!(foo.edited_models, vec!["User.json"]);
        assert_eq!(foo.created_models, vec!["New.json"]);
        assert_eq!(foo.deleted_models, vec!["Old.json"]);
        assert!(foo.created_files.is_empty());
    }
}
