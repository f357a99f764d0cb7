//! Remote content fetcher.
//!
//! Class contents are fetched with one call per class, concurrently. Every
//! call settles before failures are inspected, and a single failed class
//! aborts the whole fetch.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::ClassSelection;
use crate::api::{Api, RemoteClassFile};
use crate::schema::{ClassEntry, EntitySchema};
use crate::snapshot::{ClassContent, ContentMap, DependencyBundle, ProjectSnapshot};
use crate::sync::decode_content;
use crate::utils::{Result, SyncError};

/// Fetch the remote side of the project.
///
/// Only classes that are both selected and known to the platform are
/// fetched; selected classes the platform has never seen stay local-new.
pub async fn fetch_remote(
    api: &dyn Api,
    schema: &EntitySchema,
    selection: &ClassSelection,
    limit: Arc<Semaphore>,
) -> Result<ProjectSnapshot> {
    let state = api
        .get_project_state()
        .await
        .map_err(|e| SyncError::remote_fetch("project state", e))?;

    let scope: Vec<&str> = state
        .classes
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| selection.includes(name))
        .collect();
    debug!("remote fetch scope: {:?}", scope);

    let fetches = scope.iter().map(|name| {
        let limit = Arc::clone(&limit);
        async move {
            let _permit = limit
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Config(format!("I/O limiter closed: {e}")))?;
            let files = api.get_remote_class_files(name).await?;
            decode_class(files, schema).await
        }
    });
    let settled = join_all(fetches).await;

    let mut snapshot = ProjectSnapshot::default();
    for (name, result) in scope.iter().zip(settled) {
        let content = result.map_err(|e| SyncError::remote_fetch(format!("class {name}"), e))?;
        snapshot.classes.insert(name.to_string(), content);
    }

    let dependencies = api
        .get_remote_dependencies()
        .await
        .map_err(|e| SyncError::remote_fetch("dependencies", e))?;
    for dep in dependencies {
        snapshot.dependencies.insert(
            dep.dependency_name,
            DependencyBundle {
                hash: dep.hash,
                source: None,
            },
        );
    }

    for model in &state.models {
        snapshot
            .models
            .insert(model.name.clone(), Bytes::from(model.content.clone()));
    }

    for file in state
        .files
        .iter()
        .filter(|f| schema.project_files.contains(&f.name.as_str()))
    {
        let content = decode_content(&file.content)
            .await
            .map_err(|e| SyncError::remote_fetch(format!("project file {}", file.name), e))?;
        snapshot.files.insert(file.name.clone(), content);
    }

    info!(
        "Remote project: {} classes fetched, {} models, {} dependencies, {} project files",
        snapshot.classes.len(),
        snapshot.models.len(),
        snapshot.dependencies.len(),
        snapshot.files.len()
    );
    Ok(snapshot)
}

async fn decode_class(files: Vec<RemoteClassFile>, schema: &EntitySchema) -> Result<ClassContent> {
    let mut content = ClassContent::default();
    for file in files {
        let bytes = decode_content(&file.content).await?;
        match schema.classify(&file.name) {
            ClassEntry::File(name) => insert_unique(&mut content.files, name, bytes)?,
            ClassEntry::Model(name) => insert_unique(&mut content.models, name, bytes)?,
        }
    }
    Ok(content)
}

fn insert_unique(map: &mut ContentMap, name: String, bytes: Bytes) -> Result<()> {
    if map.contains_key(&name) {
        return Err(SyncError::Validation(format!(
            "platform returned {name:?} twice"
        )));
    }
    map.insert(name, bytes);
    Ok(())
}
