//! Shared fixtures: an on-disk project builder and a recording `Api`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use cloudsync::api::{
    Api, BoxFuture, ProjectState, RemoteClass, RemoteClassFile, RemoteDependency, RemoteEntry,
    SaveItem, UploadTarget,
};
use cloudsync::diff::ComparisonSummary;
use cloudsync::schema::ApiVersion;
use cloudsync::session::Approver;
use cloudsync::sync::encode_content;
use cloudsync::ws::{DeployStatus, DeployStatusEvent, StatusReceiver};
use cloudsync::{Result, SyncError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Every mutating call the engine issued, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateClass(String),
    SaveClassFiles(String, Vec<SaveItem>),
    SaveProjectFiles(Vec<SaveItem>),
    UpsertModel(String, String),
    DeleteModel(String),
    DeployClass(String, bool),
    UpsertDependency(String),
    UploadBundle(String, usize),
    CommitDependency(String, String),
}

impl Call {
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Call::CreateClass(n)
            | Call::SaveClassFiles(n, _)
            | Call::UpsertModel(n, _)
            | Call::DeleteModel(n)
            | Call::DeployClass(n, _)
            | Call::UpsertDependency(n)
            | Call::CommitDependency(n, _) => n == name,
            Call::UploadBundle(url, _) => url.ends_with(name),
            Call::SaveProjectFiles(items) => items.iter().any(|i| i.name == name),
        }
    }
}

pub struct RecordingApi {
    pub version: ApiVersion,
    pub state: ProjectState,
    pub class_files: HashMap<String, Vec<RemoteClassFile>>,
    pub dependencies: Vec<RemoteDependency>,
    /// Classes whose file listing fails.
    pub broken_classes: Vec<String>,
    /// Make `save_class_files` fail for this class.
    pub fail_save_for: Option<String>,
    /// Message of a `failed` deploy status; `None` finishes normally.
    pub deploy_failure: Option<String>,
    /// Cancelled right after the first class is created.
    pub cancel_on_create: Option<CancellationToken>,
    pub calls: Mutex<Vec<Call>>,
}

impl RecordingApi {
    pub fn new(version: ApiVersion) -> Self {
        Self {
            version,
            state: ProjectState::default(),
            class_files: HashMap::new(),
            dependencies: Vec::new(),
            broken_classes: Vec::new(),
            fail_save_for: None,
            deploy_failure: None,
            cancel_on_create: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a remote class with plain-text file contents.
    pub async fn with_class(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        let mut remote = Vec::new();
        for (file, content) in files {
            remote.push(RemoteClassFile {
                name: file.to_string(),
                content: encode_content(content.as_bytes()).await.unwrap(),
                class_id: Some(format!("id-{name}")),
            });
        }
        self.state.classes.push(RemoteClass {
            name: name.to_string(),
            id: Some(format!("id-{name}")),
        });
        self.class_files.insert(name.to_string(), remote);
        self
    }

    pub fn with_model(mut self, name: &str, content: &str) -> Self {
        self.state.models.push(RemoteEntry {
            name: name.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn with_dependency(mut self, name: &str, hash: &str) -> Self {
        self.dependencies.push(RemoteDependency {
            dependency_name: name.to_string(),
            hash: hash.to_string(),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Api for RecordingApi {
    fn api_version(&self) -> BoxFuture<'_, Result<ApiVersion>> {
        Box::pin(async move { Ok(self.version) })
    }

    fn get_project_state(&self) -> BoxFuture<'_, Result<ProjectState>> {
        Box::pin(async move { Ok(self.state.clone()) })
    }

    fn get_remote_class_files<'a>(
        &'a self,
        class_name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteClassFile>>> {
        Box::pin(async move {
            if self.broken_classes.iter().any(|c| c == class_name) {
                return Err(SyncError::Api {
                    status: 500,
                    body: "storage unavailable".into(),
                });
            }
            Ok(self.class_files.get(class_name).cloned().unwrap_or_default())
        })
    }

    fn get_remote_dependencies(&self) -> BoxFuture<'_, Result<Vec<RemoteDependency>>> {
        Box::pin(async move { Ok(self.dependencies.clone()) })
    }

    fn create_class<'a>(&'a self, class_name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::CreateClass(class_name.to_string()));
            if let Some(token) = &self.cancel_on_create {
                token.cancel();
            }
            Ok(())
        })
    }

    fn save_class_files<'a>(
        &'a self,
        class_name: &'a str,
        items: Vec<SaveItem>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.fail_save_for.as_deref() == Some(class_name) {
                return Err(SyncError::Api {
                    status: 409,
                    body: "class is locked".into(),
                });
            }
            self.record(Call::SaveClassFiles(class_name.to_string(), items));
            Ok(())
        })
    }

    fn save_project_files(&self, items: Vec<SaveItem>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(Call::SaveProjectFiles(items));
            Ok(())
        })
    }

    fn upsert_model<'a>(&'a self, name: &'a str, content: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::UpsertModel(name.to_string(), content.to_string()));
            Ok(())
        })
    }

    fn delete_model<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::DeleteModel(name.to_string()));
            Ok(())
        })
    }

    fn deploy_class<'a>(
        &'a self,
        class_name: &'a str,
        force: bool,
    ) -> BoxFuture<'a, Result<StatusReceiver>> {
        Box::pin(async move {
            self.record(Call::DeployClass(class_name.to_string(), force));
            let (tx, rx) = mpsc::channel(8);
            tx.send(DeployStatusEvent::new(DeployStatus::Started))
                .await
                .unwrap();
            tx.send(DeployStatusEvent::new(DeployStatus::Ongoing))
                .await
                .unwrap();
            let last = match &self.deploy_failure {
                Some(message) => DeployStatusEvent::failed(message.clone()),
                None => DeployStatusEvent::new(DeployStatus::Finished),
            };
            tx.send(last).await.unwrap();
            Ok(rx)
        })
    }

    fn upsert_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<UploadTarget>> {
        Box::pin(async move {
            self.record(Call::UpsertDependency(name.to_string()));
            Ok(UploadTarget {
                upload_url: format!("https://uploads.test/{name}"),
            })
        })
    }

    fn upload_bundle<'a>(
        &'a self,
        target: &'a UploadTarget,
        bundle: Bytes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::UploadBundle(target.upload_url.clone(), bundle.len()));
            Ok(())
        })
    }

    fn commit_upsert_dependency<'a>(
        &'a self,
        name: &'a str,
        hash: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::CommitDependency(name.to_string(), hash.to_string()));
            Ok(())
        })
    }
}

/// Approver with a fixed answer that counts how often it was asked.
pub struct FixedApprover {
    pub answer: bool,
    pub asked: Mutex<usize>,
}

impl FixedApprover {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        *self.asked.lock().unwrap()
    }
}

impl Approver for FixedApprover {
    fn approve(&self, _summary: &ComparisonSummary) -> Result<bool> {
        *self.asked.lock().unwrap() += 1;
        Ok(self.answer)
    }
}
