//! Recursive content hash for dependency bundles.
//!
//! A file hashes to the SHA-256 of its bytes. A folder hashes to the SHA-256
//! of `name NUL digest NUL` for each child, taken in file-name order, so a
//! rename changes the folder digest. Symbolic links are skipped, matching the
//! entries `zip_directory` puts in the uploaded archive. Sibling entries are
//! hashed concurrently; only file reads hold a semaphore permit, so deep trees
//! cannot starve their own parents.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::utils::errors::io_err;
use crate::utils::{Result, SyncError};

type HashFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Hash a file or folder. Metadata such as mtimes never contributes.
pub fn hash_path(path: PathBuf, limit: Arc<Semaphore>) -> HashFuture {
    Box::pin(async move {
        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| io_err(&path, e))?;

        if !metadata.is_dir() {
            let _permit = limit
                .acquire()
                .await
                .map_err(|e| SyncError::Config(format!("I/O limiter closed: {e}")))?;
            let bytes = tokio::fs::read(&path).await.map_err(|e| io_err(&path, e))?;
            return Ok(hex::encode(Sha256::digest(&bytes)));
        }

        let mut children = Vec::new();
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_err(&path, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&path, e))? {
            let file_type = entry.file_type().await.map_err(|e| io_err(&entry.path(), e))?;
            if file_type.is_symlink() {
                debug!("skipping symlink {}", entry.path().display());
                continue;
            }
            children.push(entry.path());
        }
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let handles: Vec<_> = children
            .into_iter()
            .map(|child| {
                let name = child
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (name, tokio::spawn(hash_path(child, Arc::clone(&limit))))
            })
            .collect();

        // Settle every child before inspecting failures.
        let mut digests = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            digests.push((name, handle.await));
        }

        let mut hasher = Sha256::new();
        for (name, digest) in digests {
            hasher.update(name.as_bytes());
            hasher.update([0]);
            hasher.update(digest??.as_bytes());
            hasher.update([0]);
        }
        let digest = hex::encode(hasher.finalize());
        debug!("hashed {} -> {}", path.display(), digest);
        Ok(digest)
    })
}
