//! Local content fetcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::ClassSelection;
use crate::fs::walker::{walk_directory, FileInfo, WalkOptions};
use crate::schema::{ClassEntry, EntitySchema, CLASSES_DIR, DEPENDENCIES_DIR, MODELS_DIR};
use crate::snapshot::{ClassContent, ContentMap, DependencyBundle, ProjectSnapshot};
use crate::sync::hash_path;
use crate::utils::errors::io_err;
use crate::utils::{Result, SyncError};

/// Read the local project rooted at `root`.
///
/// Every selected class must exist under `classes/`.
pub async fn fetch_local(
    root: &Path,
    schema: &'static EntitySchema,
    selection: &ClassSelection,
    limit: Arc<Semaphore>,
) -> Result<ProjectSnapshot> {
    let mut snapshot = ProjectSnapshot::default();

    let class_names = list_dirs(&root.join(CLASSES_DIR)).await?;
    if let ClassSelection::Only(requested) = selection {
        let missing: Vec<_> = requested
            .iter()
            .filter(|name| !class_names.contains(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::Validation(format!(
                "class(es) not found under {}: {}",
                root.join(CLASSES_DIR).display(),
                missing.join(", ")
            )));
        }
    }

    for name in class_names.into_iter().filter(|n| selection.includes(n)) {
        let dir = root.join(CLASSES_DIR).join(&name);
        let content = fetch_class(&dir, schema, Arc::clone(&limit)).await?;
        debug!(
            "local class {}: {} files, {} models",
            name,
            content.files.len(),
            content.models.len()
        );
        snapshot.classes.insert(name, content);
    }

    snapshot.models = fetch_models(&root.join(MODELS_DIR), Arc::clone(&limit)).await?;
    snapshot.files = fetch_project_files(root, schema).await?;

    for name in list_dirs(&root.join(DEPENDENCIES_DIR)).await? {
        let source = root.join(DEPENDENCIES_DIR).join(&name);
        let hash = hash_path(source.clone(), Arc::clone(&limit)).await?;
        snapshot.dependencies.insert(
            name,
            DependencyBundle {
                hash,
                source: Some(source),
            },
        );
    }

    info!(
        "Local project: {} classes, {} models, {} dependencies, {} project files",
        snapshot.classes.len(),
        snapshot.models.len(),
        snapshot.dependencies.len(),
        snapshot.files.len()
    );
    Ok(snapshot)
}

/// Read one class folder, splitting models from files per `schema`.
pub async fn fetch_class(
    dir: &Path,
    schema: &EntitySchema,
    limit: Arc<Semaphore>,
) -> Result<ClassContent> {
    let dir_owned = dir.to_path_buf();
    let files = tokio::task::spawn_blocking(move || {
        walk_directory(&dir_owned, &WalkOptions::default()).map_err(|e| io_err(&dir_owned, e))
    })
    .await??;

    let mut content = ClassContent::default();
    for (relative, bytes) in read_files(files, limit).await? {
        match schema.classify(&relative) {
            ClassEntry::File(name) => content.files.insert(name, bytes),
            ClassEntry::Model(name) => content.models.insert(name, bytes),
        };
    }
    Ok(content)
}

/// Read files concurrently, one task per file, bounded by `limit`.
///
/// All reads settle before any failure is reported.
async fn read_files(files: Vec<FileInfo>, limit: Arc<Semaphore>) -> Result<Vec<(String, Bytes)>> {
    let handles: Vec<_> = files
        .into_iter()
        .map(|file| {
            let limit = Arc::clone(&limit);
            tokio::spawn(async move {
                let _permit = limit
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Config(format!("I/O limiter closed: {e}")))?;
                let bytes = tokio::fs::read(&file.path)
                    .await
                    .map_err(|e| io_err(&file.path, e))?;
                Ok::<_, SyncError>((file.relative_path, Bytes::from(bytes)))
            })
        })
        .collect();

    let mut settled = Vec::with_capacity(handles.len());
    for handle in handles {
        settled.push(handle.await);
    }

    settled
        .into_iter()
        .map(|joined| joined.map_err(SyncError::from).and_then(|r| r))
        .collect()
}

/// Project-level models: direct files of `models/`, keyed by file stem.
async fn fetch_models(dir: &Path, limit: Arc<Semaphore>) -> Result<ContentMap> {
    if !tokio::fs::try_exists(dir).await.map_err(|e| io_err(dir, e))? {
        return Ok(ContentMap::new());
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_err(dir, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(dir, e))? {
        let file_type = entry.file_type().await.map_err(|e| io_err(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        files.push(FileInfo {
            relative_path: stem,
            size: 0,
            path,
        });
    }

    let mut models = ContentMap::new();
    for (name, bytes) in read_files(files, limit).await? {
        if models.insert(name.clone(), bytes).is_some() {
            return Err(SyncError::Validation(format!(
                "two files in {} share the model name {name:?}",
                dir.display()
            )));
        }
    }
    Ok(models)
}

async fn fetch_project_files(root: &Path, schema: &EntitySchema) -> Result<ContentMap> {
    let mut files = ContentMap::new();
    for name in schema.project_files {
        let path = root.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                files.insert(name.to_string(), Bytes::from(bytes));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(path, e)),
        }
    }
    Ok(files)
}

/// Sorted names of the subfolders of `dir`; empty when `dir` is absent.
async fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(io_err(dir, e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(dir, e))? {
        let path: PathBuf = entry.path();
        if entry
            .file_type()
            .await
            .map_err(|e| io_err(&path, e))?
            .is_dir()
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}
