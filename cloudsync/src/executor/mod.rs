//! Deployment orchestrator.
//!
//! Applies a comparison to the platform in four stages. Later stages rely on
//! the server-side effects of earlier ones, so stages run strictly in order:
//!
//! 1. dependency bundles (upsert, binary upload, commit)
//! 2. class creation
//! 3. saves: class files, project models, project files
//! 4. deploy trigger and status wait (deploy mode only)
//!
//! Items within a stage run concurrently, bounded by the shared limiter.
//! The first failing item is reported as `FAILED` and aborts the run.

pub mod plan;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{Api, BoxFuture, SaveItem};
use crate::context::PreDeploymentContext;
use crate::events::{EventBus, EventKind, ItemStatus};
use crate::fs::bundle::zip_directory;
use crate::sync::encode_content;
use crate::utils::{Result, SyncError};
use crate::ws::wait_for_deployment;
use plan::{DeployPlan, PlannedDependency, PlannedSave};

/// How a run applies its comparison.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Re-send every local item and redeploy regardless of differences.
    pub force: bool,
    /// Treat every local item as forced when building the plan.
    pub skip_diff_check: bool,
    /// Trigger class deployments after saving. `false` is save-only.
    pub deploy: bool,
    /// Per-class deadline for the status wait. `None` waits indefinitely.
    pub status_timeout: Option<Duration>,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub uploaded_dependencies: Vec<String>,
    pub created_classes: Vec<String>,
    pub saved_classes: Vec<String>,
    pub upserted_models: Vec<String>,
    pub deleted_models: Vec<String>,
    pub saved_project_files: Vec<String>,
    pub deployed_classes: Vec<String>,
    pub duration_secs: f64,
}

/// Applies plans to the platform.
pub struct Deployer {
    api: Arc<dyn Api>,
    events: EventBus,
    cancel: CancellationToken,
    limit: Arc<Semaphore>,
}

impl Deployer {
    pub fn new(
        api: Arc<dyn Api>,
        events: EventBus,
        limit: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            events,
            cancel,
            limit,
        }
    }

    /// Apply the context's comparison. Fails fast on the first item error.
    pub async fn deploy(
        &self,
        context: &PreDeploymentContext,
        options: &DeployOptions,
    ) -> Result<DeployReport> {
        let start = Instant::now();
        let plan = DeployPlan::build(context, options)?;
        info!(
            "Deploying with profile {}",
            context.profile.as_deref().unwrap_or("default")
        );
        info!(
            "Deployment plan: {} dependencies, {} new classes, {} class saves, {} model upserts, {} model deletes, {} project files, {} deploys",
            plan.dependencies.len(),
            plan.create_classes.len(),
            plan.class_saves.len(),
            plan.model_upserts.len(),
            plan.model_deletes.len(),
            plan.project_files.len(),
            plan.deploy_classes.len()
        );

        let mut report = DeployReport::default();

        self.checkpoint()?;
        self.upload_dependencies(&plan.dependencies).await?;
        report.uploaded_dependencies = plan.dependencies.iter().map(|d| d.name.clone()).collect();

        self.checkpoint()?;
        self.create_classes(&plan.create_classes).await?;
        report.created_classes = plan.create_classes.clone();

        self.checkpoint()?;
        self.save(&plan).await?;
        report.saved_classes = plan.class_saves.keys().cloned().collect();
        report.upserted_models = plan.model_upserts.iter().map(|(name, _)| name.clone()).collect();
        report.deleted_models = plan.model_deletes.clone();
        report.saved_project_files = plan.project_files.iter().map(|s| s.name.clone()).collect();

        if !plan.deploy_classes.is_empty() {
            self.checkpoint()?;
            self.deploy_classes(&plan.deploy_classes, options).await?;
            report.deployed_classes = plan.deploy_classes.clone();
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!("Deployment completed in {:.1}s", report.duration_secs);
        Ok(report)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("Deployment cancelled between stages");
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Run one item: PENDING, then DONE or FAILED. Holds a limiter permit
    /// for the item's duration. An item cancelled while queued for a permit
    /// still ends in FAILED.
    async fn track<T, F>(&self, kind: EventKind, name: &str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.events.publish(kind, name, ItemStatus::Pending);

        let acquired = tokio::select! {
            permit = self.limit.acquire() => permit
                .map_err(|e| SyncError::Config(format!("I/O limiter closed: {e}"))),
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
        };
        let _permit = match acquired {
            Ok(permit) => permit,
            Err(e) => {
                warn!("{:?} {} not started: {}", kind, name, e);
                self.events
                    .publish(kind, name, ItemStatus::Failed(e.to_string()));
                return Err(e);
            }
        };

        match work.await {
            Ok(value) => {
                debug!("{:?} {} done", kind, name);
                self.events.publish(kind, name, ItemStatus::Done);
                Ok(value)
            }
            Err(e) => {
                error!("{:?} {} failed: {}", kind, name, e);
                self.events
                    .publish(kind, name, ItemStatus::Failed(e.to_string()));
                Err(SyncError::deploy(name, e))
            }
        }
    }

    async fn upload_dependencies(&self, dependencies: &[PlannedDependency]) -> Result<()> {
        if dependencies.is_empty() {
            return Ok(());
        }
        info!("Uploading {} dependency bundle(s)", dependencies.len());

        try_join_all(dependencies.iter().map(|dep| {
            self.track(EventKind::Dependency, &dep.name, self.upload_dependency(dep))
        }))
        .await?;
        Ok(())
    }

    async fn upload_dependency(&self, dep: &PlannedDependency) -> Result<()> {
        let source = dep.source.clone();
        let bundle = tokio::task::spawn_blocking(move || zip_directory(&source)).await??;
        debug!("Zipped {} ({} bytes)", dep.name, bundle.len());

        let target = self.api.upsert_dependency(&dep.name).await?;
        self.api.upload_bundle(&target, bundle).await?;
        self.api.commit_upsert_dependency(&dep.name, &dep.hash).await
    }

    async fn create_classes(&self, classes: &[String]) -> Result<()> {
        if classes.is_empty() {
            return Ok(());
        }
        info!("Creating {} class(es)", classes.len());

        try_join_all(
            classes
                .iter()
                .map(|class| self.track(EventKind::CreateClass, class, self.api.create_class(class))),
        )
        .await?;
        Ok(())
    }

    async fn save(&self, plan: &DeployPlan) -> Result<()> {
        let mut work: Vec<BoxFuture<'_, Result<()>>> = Vec::new();

        for (class, saves) in &plan.class_saves {
            work.push(Box::pin(self.track(EventKind::ClassFiles, class, async move {
                let items = encode_items(saves).await?;
                self.api.save_class_files(class, items).await
            })));
        }

        for (name, content) in &plan.model_upserts {
            work.push(Box::pin(self.track(EventKind::Model, name, async move {
                let text = std::str::from_utf8(content).map_err(|e| {
                    SyncError::Validation(format!("model {name} is not valid UTF-8: {e}"))
                })?;
                self.api.upsert_model(name, text).await
            })));
        }

        for name in &plan.model_deletes {
            work.push(Box::pin(
                self.track(EventKind::Model, name, self.api.delete_model(name)),
            ));
        }

        if !plan.project_files.is_empty() {
            work.push(Box::pin(self.track(
                EventKind::ProjectFiles,
                "project files",
                async move {
                    let items = encode_items(&plan.project_files).await?;
                    self.api.save_project_files(items).await
                },
            )));
        }

        if work.is_empty() {
            return Ok(());
        }
        info!("Saving {} batch(es)", work.len());
        try_join_all(work).await?;
        Ok(())
    }

    async fn deploy_classes(&self, classes: &[String], options: &DeployOptions) -> Result<()> {
        info!("Deploying {} class(es)", classes.len());

        try_join_all(classes.iter().map(|class| {
            self.track(EventKind::Deploy, class, async move {
                let status = self.api.deploy_class(class, options.force).await?;
                wait_for_deployment(class, status, options.status_timeout, &self.cancel).await
            })
        }))
        .await?;
        Ok(())
    }
}

async fn encode_items(saves: &[PlannedSave]) -> Result<Vec<SaveItem>> {
    let mut items = Vec::with_capacity(saves.len());
    for save in saves {
        let content = match &save.content {
            Some(bytes) => Some(encode_content(bytes).await?),
            None => None,
        };
        items.push(SaveItem {
            name: save.name.clone(),
            status: save.status,
            content,
        });
    }
    Ok(items)
}
