//! Turns a comparison into the concrete calls each stage makes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

use super::DeployOptions;
use crate::api::FileStatus;
use crate::context::PreDeploymentContext;
use crate::diff::{operations, OperationKind, OperationStatus};
use crate::gate::is_changed;
use crate::utils::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDependency {
    pub name: String,
    pub hash: String,
    pub source: PathBuf,
}

/// One entry of a save batch before its content is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSave {
    /// Name on the wire, e.g. `models/User.json` for a v1 class model.
    pub name: String,
    pub status: FileStatus,
    /// Absent for deletions.
    pub content: Option<Bytes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    pub dependencies: Vec<PlannedDependency>,
    pub create_classes: Vec<String>,
    pub class_saves: BTreeMap<String, Vec<PlannedSave>>,
    pub model_upserts: Vec<(String, Bytes)>,
    pub model_deletes: Vec<String>,
    pub project_files: Vec<PlannedSave>,
    pub deploy_classes: Vec<String>,
}

fn file_status(status: OperationStatus) -> FileStatus {
    match status {
        OperationStatus::Created => FileStatus::Added,
        OperationStatus::Deleted => FileStatus::Deleted,
        // forced items exist on both sides
        OperationStatus::Edited | OperationStatus::None => FileStatus::Edited,
    }
}

fn missing(kind: &str, name: &str) -> SyncError {
    SyncError::Validation(format!("{kind} {name} has no local content"))
}

impl DeployPlan {
    /// Build the plan for one run.
    ///
    /// Remote-only dependencies and classes never produce calls.
    pub fn build(context: &PreDeploymentContext, options: &DeployOptions) -> Result<Self> {
        let comparison = context.plan_comparison(options.force || options.skip_diff_check);
        let decisions = &comparison.decisions;
        let mut plan = DeployPlan::default();

        for item in operations(&comparison, &context.local, &context.remote) {
            debug!("planning {:?} {:?} {}", item.kind, item.status, item.label());
            match item.kind {
                OperationKind::Dependency => {
                    if !decisions.upload_dependencies.contains(&item.path) {
                        continue;
                    }
                    let bundle = context
                        .local
                        .dependencies
                        .get(&item.path)
                        .ok_or_else(|| missing("dependency", &item.path))?;
                    let source = bundle
                        .source
                        .clone()
                        .ok_or_else(|| missing("dependency", &item.path))?;
                    plan.dependencies.push(PlannedDependency {
                        name: item.path,
                        hash: bundle.hash.clone(),
                        source,
                    });
                }
                OperationKind::Class => {
                    if decisions.create_classes.contains(&item.path) {
                        plan.create_classes.push(item.path);
                    }
                }
                OperationKind::ClassFile | OperationKind::ClassModel => {
                    let Some(class) = item.class else { continue };
                    if !decisions.save_classes.contains(&class) {
                        continue;
                    }
                    let name = if item.kind == OperationKind::ClassModel {
                        context.schema.model_path(&item.path)
                    } else {
                        item.path
                    };
                    let content = match item.status {
                        OperationStatus::Deleted => None,
                        _ => Some(item.new_content.ok_or_else(|| missing("file", &name))?),
                    };
                    plan.class_saves.entry(class).or_default().push(PlannedSave {
                        name,
                        status: file_status(item.status),
                        content,
                    });
                }
                OperationKind::Model => match item.status {
                    OperationStatus::Deleted => plan.model_deletes.push(item.path),
                    _ => {
                        let content = item
                            .new_content
                            .ok_or_else(|| missing("model", &item.path))?;
                        plan.model_upserts.push((item.path, content));
                    }
                },
                OperationKind::ProjectFile => {
                    let content = match item.status {
                        OperationStatus::Deleted => None,
                        _ => Some(
                            item.new_content
                                .ok_or_else(|| missing("project file", &item.path))?,
                        ),
                    };
                    plan.project_files.push(PlannedSave {
                        name: item.path,
                        status: file_status(item.status),
                        content,
                    });
                }
            }
        }

        if options.deploy && (options.force || is_changed(&context.comparison.summary)) {
            plan.deploy_classes = context.local.classes.keys().cloned().collect();
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::fetch::ClassSelection;
    use crate::schema::{EntitySchema, V1, V2};
    use crate::snapshot::{ClassContent, DependencyBundle, ProjectSnapshot};

    fn context(
        local: ProjectSnapshot,
        remote: ProjectSnapshot,
        schema: &'static EntitySchema,
    ) -> PreDeploymentContext {
        let comparison = diff(&local, &remote, schema, false);
        PreDeploymentContext {
            schema,
            local,
            remote,
            comparison,
            profile: None,
            selection: ClassSelection::All,
        }
    }

    fn class(files: &[(&str, &'static str)]) -> ClassContent {
        let mut class = ClassContent::default();
        for (name, content) in files {
            class
                .files
                .insert(name.to_string(), Bytes::from_static(content.as_bytes()));
        }
        class
    }

    fn deploy() -> DeployOptions {
        DeployOptions {
            deploy: true,
            ..DeployOptions::default()
        }
    }

    #[test]
    fn edited_file_becomes_single_save() {
        let mut local = ProjectSnapshot::default();
        local.classes.insert("Foo".into(), class(&[("index.js", "v2"), ("b.js", "b")]));
        let mut remote = ProjectSnapshot::default();
        remote.classes.insert("Foo".into(), class(&[("index.js", "v1"), ("b.js", "b")]));

        let plan = DeployPlan::build(&context(local, remote, &V2), &deploy()).unwrap();
        assert!(plan.create_classes.is_empty());
        assert_eq!(
            plan.class_saves["Foo"],
            vec![PlannedSave {
                name: "index.js".into(),
                status: FileStatus::Edited,
                content: Some(Bytes::from_static(b"v2")),
            }]
        );
        assert_eq!(plan.deploy_classes, vec!["Foo"]);
    }

    #[test]
    fn deleted_file_in_existing_class_is_saved_without_content() {
        let mut local = ProjectSnapshot::default();
        local.classes.insert("Foo".into(), class(&[("index.js", "same")]));
        let mut remote = ProjectSnapshot::default();
        remote
            .classes
            .insert("Foo".into(), class(&[("index.js", "same"), ("old.js", "gone")]));

        let plan = DeployPlan::build(&context(local, remote, &V2), &deploy()).unwrap();
        assert!(plan.create_classes.is_empty());
        assert_eq!(
            plan.class_saves["Foo"],
            vec![PlannedSave {
                name: "old.js".into(),
                status: FileStatus::Deleted,
                content: None,
            }]
        );
        assert_eq!(plan.deploy_classes, vec!["Foo"]);
    }

    #[test]
    fn remote_only_entities_produce_no_calls() {
        let local = ProjectSnapshot::default();
        let mut remote = ProjectSnapshot::default();
        remote.classes.insert("Gone".into(), class(&[("a.js", "a")]));
        remote.dependencies.insert(
            "old".into(),
            DependencyBundle {
                hash: "h".into(),
                source: None,
            },
        );

        let plan = DeployPlan::build(&context(local, remote, &V2), &deploy()).unwrap();
        assert!(plan.dependencies.is_empty());
        assert!(plan.class_saves.is_empty());
        assert!(plan.create_classes.is_empty());
        assert!(plan.deploy_classes.is_empty());
    }

    #[test]
    fn force_resends_everything_and_deploys() {
        let mut local = ProjectSnapshot::default();
        local.classes.insert("Foo".into(), class(&[("index.js", "same")]));
        let remote = local.clone();

        let ctx = context(local, remote, &V2);
        let unforced = DeployPlan::build(&ctx, &deploy()).unwrap();
        assert_eq!(unforced, DeployPlan::default());

        let forced = DeployPlan::build(
            &ctx,
            &DeployOptions {
                force: true,
                deploy: true,
                ..DeployOptions::default()
            },
        )
        .unwrap();
        assert_eq!(forced.class_saves["Foo"][0].status, FileStatus::Edited);
        assert_eq!(forced.deploy_classes, vec!["Foo"]);
    }

    #[test]
    fn v1_class_models_save_under_models_folder() {
        let mut local = ProjectSnapshot::default();
        let mut foo = class(&[]);
        foo.models
            .insert("User.json".into(), Bytes::from_static(b"{}"));
        local.classes.insert("Foo".into(), foo);

        let plan = DeployPlan::build(&context(local, ProjectSnapshot::default(), &V1), &deploy())
            .unwrap();
        assert_eq!(plan.create_classes, vec!["Foo"]);
        assert_eq!(plan.class_saves["Foo"][0].name, "models/User.json");
        assert_eq!(plan.class_saves["Foo"][0].status, FileStatus::Added);
    }

    #[test]
    fn save_only_never_deploys_and_deleted_models_are_deleted() {
        let local = ProjectSnapshot::default();
        let mut remote = ProjectSnapshot::default();
        remote.models.insert("A".into(), Bytes::from_static(b"{}"));

        let plan = DeployPlan::build(
            &context(local, remote, &V2),
            &DeployOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.model_deletes, vec!["A"]);
        assert!(plan.deploy_classes.is_empty());
    }
}
