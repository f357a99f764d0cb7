//! Remote platform port.
//!
//! The engine only talks to the platform through [`Api`]. One client is
//! constructed per command invocation and passed in explicitly; tests swap
//! in a recording implementation.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::schema::ApiVersion;
use crate::utils::Result;
use crate::ws::StatusReceiver;

/// Boxed future used by the port trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A class known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClass {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// A registered dependency bundle and its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDependency {
    pub dependency_name: String,
    pub hash: String,
}

/// A named project-level entry (model or project file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub content: String,
}

/// Project state as reported by the platform.
///
/// Model content is raw text; project file content is gzip + base64.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub classes: Vec<RemoteClass>,
    #[serde(default)]
    pub dependencies: Vec<RemoteDependency>,
    #[serde(default)]
    pub models: Vec<RemoteEntry>,
    #[serde(default)]
    pub files: Vec<RemoteEntry>,
}

/// One stored file of a class. `content` is gzip + base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClassFile {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub class_id: Option<String>,
}

/// Per-item status understood by the platform's save endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Added,
    Edited,
    Deleted,
}

/// One entry of a save batch. Deleted items carry no content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveItem {
    pub name: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Pre-signed destination for a dependency bundle upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
}

/// Capabilities of the remote platform.
pub trait Api: Send + Sync {
    /// Schema generation served by the platform.
    fn api_version(&self) -> BoxFuture<'_, Result<ApiVersion>>;

    fn get_project_state(&self) -> BoxFuture<'_, Result<ProjectState>>;

    fn get_remote_class_files<'a>(
        &'a self,
        class_name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteClassFile>>>;

    fn get_remote_dependencies(&self) -> BoxFuture<'_, Result<Vec<RemoteDependency>>>;

    fn create_class<'a>(&'a self, class_name: &'a str) -> BoxFuture<'a, Result<()>>;

    fn save_class_files<'a>(
        &'a self,
        class_name: &'a str,
        items: Vec<SaveItem>,
    ) -> BoxFuture<'a, Result<()>>;

    fn save_project_files(&self, items: Vec<SaveItem>) -> BoxFuture<'_, Result<()>>;

    fn upsert_model<'a>(&'a self, name: &'a str, content: &'a str) -> BoxFuture<'a, Result<()>>;

    fn delete_model<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Start an asynchronous deployment and subscribe to its status stream.
    fn deploy_class<'a>(
        &'a self,
        class_name: &'a str,
        force: bool,
    ) -> BoxFuture<'a, Result<StatusReceiver>>;

    /// First phase of a bundle upload: obtain the upload destination.
    fn upsert_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<UploadTarget>>;

    /// Binary PUT of a zipped bundle to its upload destination.
    fn upload_bundle<'a>(
        &'a self,
        target: &'a UploadTarget,
        bundle: Bytes,
    ) -> BoxFuture<'a, Result<()>>;

    /// Finalize a bundle upload by registering its content hash.
    fn commit_upsert_dependency<'a>(
        &'a self,
        name: &'a str,
        hash: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}
