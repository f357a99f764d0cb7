//! HTTP adapter for the [`Api`] port.
//!
//! Every project-scoped route lives under `{base_url}/projects/{project_id}`.
//! Names are pushed as single path segments, so slashes and spaces in a class
//! or model name are percent-encoded rather than splitting the route.
//! Non-2xx responses become [`SyncError::Api`] carrying status and body.

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    Api, BoxFuture, ProjectState, RemoteClassFile, RemoteDependency, SaveItem, UploadTarget,
};
use crate::schema::ApiVersion;
use crate::utils::{Result, SyncError};
use crate::ws::{client as status_client, StatusReceiver};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Capabilities {
    api_version: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployStarted {
    deployment_id: String,
}

/// reqwest-backed platform client, scoped to one project.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    project_id: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: &str, project_id: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("invalid API URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "API URL {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            client,
            base_url,
            project_id: project_id.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// `base_url` with `segments` appended, each one encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so the segments are always there.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn project_url(&self, segments: &[&str]) -> Url {
        let mut all = vec!["projects", self.project_id.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(SyncError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json::<T>().await?)
    }
}

impl Api for HttpApi {
    fn api_version(&self) -> BoxFuture<'_, Result<ApiVersion>> {
        Box::pin(async move {
            let caps: Capabilities = self
                .get_json(self.endpoint(&["capabilities"]))
                .await?;
            ApiVersion::from_number(caps.api_version).ok_or_else(|| {
                SyncError::Config(format!(
                    "platform reports unsupported API version {}",
                    caps.api_version
                ))
            })
        })
    }

    fn get_project_state(&self) -> BoxFuture<'_, Result<ProjectState>> {
        Box::pin(async move { self.get_json(self.project_url(&["state"])).await })
    }

    fn get_remote_class_files<'a>(
        &'a self,
        class_name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RemoteClassFile>>> {
        Box::pin(async move {
            let url = self.project_url(&["classes", class_name, "files"]);
            self.get_json(url).await
        })
    }

    fn get_remote_dependencies(&self) -> BoxFuture<'_, Result<Vec<RemoteDependency>>> {
        Box::pin(async move { self.get_json(self.project_url(&["dependencies"])).await })
    }

    fn create_class<'a>(&'a self, class_name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["classes"]);
            self.send(self.client.post(url).json(&json!({ "name": class_name })))
                .await?;
            Ok(())
        })
    }

    fn save_class_files<'a>(
        &'a self,
        class_name: &'a str,
        items: Vec<SaveItem>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["classes", class_name, "files"]);
            self.send(self.client.put(url).json(&json!({ "items": items })))
                .await?;
            Ok(())
        })
    }

    fn save_project_files(&self, items: Vec<SaveItem>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["files"]);
            self.send(self.client.put(url).json(&json!({ "items": items })))
                .await?;
            Ok(())
        })
    }

    fn upsert_model<'a>(&'a self, name: &'a str, content: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["models", name]);
            self.send(self.client.put(url).json(&json!({ "content": content })))
                .await?;
            Ok(())
        })
    }

    fn delete_model<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["models", name]);
            self.send(self.client.delete(url)).await?;
            Ok(())
        })
    }

    fn deploy_class<'a>(
        &'a self,
        class_name: &'a str,
        force: bool,
    ) -> BoxFuture<'a, Result<StatusReceiver>> {
        Box::pin(async move {
            let url = self.project_url(&["classes", class_name, "deploy"]);
            let started: DeployStarted = self
                .send(self.client.post(url).json(&json!({ "force": force })))
                .await?
                .json()
                .await?;

            let status_path = ["deployments", started.deployment_id.as_str(), "status"];
            let status_url = status_client::to_ws_url(self.project_url(&status_path).as_str());
            status_client::subscribe(&status_url, self.token.as_deref()).await
        })
    }

    fn upsert_dependency<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<UploadTarget>> {
        Box::pin(async move {
            let url = self.project_url(&["dependencies", name, "upsert"]);
            Ok(self.send(self.client.post(url)).await?.json().await?)
        })
    }

    fn upload_bundle<'a>(
        &'a self,
        target: &'a UploadTarget,
        bundle: Bytes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            debug!("PUT {} ({} bytes)", target.upload_url, bundle.len());
            // Pre-signed destinations carry their own credentials.
            let response = self
                .client
                .put(&target.upload_url)
                .header("content-type", "application/zip")
                .body(bundle)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SyncError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(())
        })
    }

    fn commit_upsert_dependency<'a>(
        &'a self,
        name: &'a str,
        hash: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let url = self.project_url(&["dependencies", name, "commit"]);
            self.send(self.client.post(url).json(&json!({ "hash": hash })))
                .await?;
            Ok(())
        })
    }
}
