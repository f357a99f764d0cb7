//! Command flow shared by `deploy`, `save` and `diff`.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dialoguer::Confirm;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::http::HttpApi;
use crate::api::Api;
use crate::config::Settings;
use crate::context::PreDeploymentContext;
use crate::diff::ComparisonSummary;
use crate::events::EventBus;
use crate::executor::{DeployOptions, DeployReport, Deployer};
use crate::fetch::ClassSelection;
use crate::gate::{is_changed, requires_approval};
use crate::project::{resolve_project_id, ProjectConfig};
use crate::report::render_summary;
use crate::utils::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Save and trigger class deployments.
    Deploy,
    /// Save only.
    Save,
    /// Compare without touching the platform.
    Diff,
}

/// Which project a command works on.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub root: PathBuf,
    pub profile: Option<String>,
    pub project_id: Option<String>,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub skip_diff_check: bool,
    pub ignore_approval: bool,
    pub force: bool,
    pub status_timeout: Option<Duration>,
}

#[derive(Debug)]
pub enum Outcome {
    /// Nothing to apply; the platform was not touched.
    NoChanges,
    Compared(ComparisonSummary),
    Applied {
        summary: ComparisonSummary,
        report: DeployReport,
    },
}

/// Asks a human whether a change set may be applied.
pub trait Approver: Send + Sync {
    fn approve(&self, summary: &ComparisonSummary) -> Result<bool>;
}

/// Interactive confirmation on the controlling terminal.
pub struct TerminalApprover;

impl Approver for TerminalApprover {
    fn approve(&self, summary: &ComparisonSummary) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            return Err(SyncError::Approval(
                "approval required but no terminal is attached; pass --ignore-approval".into(),
            ));
        }
        print!("{}", render_summary(summary));
        Confirm::new()
            .with_prompt("Apply these changes?")
            .default(false)
            .interact()
            .map_err(|e| SyncError::Approval(e.to_string()))
    }
}

/// Build the HTTP client for a target, resolving endpoint and project id.
pub async fn connect(settings: &Settings, target: &Target) -> Result<Arc<dyn Api>> {
    let endpoint = settings.endpoint(target.profile.as_deref())?;
    let project = ProjectConfig::load(&target.root).await?;
    let project_id = resolve_project_id(
        target.project_id.as_deref(),
        endpoint.project_id.as_deref(),
        &project,
    )?;
    info!("Project {} at {}", project_id, endpoint.url);

    let api = HttpApi::new(&endpoint.url, &project_id, endpoint.token)?;
    Ok(Arc::new(api))
}

/// One command invocation against an already constructed API client.
pub struct Session {
    api: Arc<dyn Api>,
    limit: Arc<Semaphore>,
    events: EventBus,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        api: Arc<dyn Api>,
        limit: Arc<Semaphore>,
        events: EventBus,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            limit,
            events,
            cancel,
        }
    }

    /// Compare, gate, then apply. Returns before any mutation when there is
    /// nothing to do.
    pub async fn run(
        self,
        mode: Mode,
        target: &Target,
        options: &RunOptions,
        approver: &dyn Approver,
    ) -> Result<Outcome> {
        let version = self.api.api_version().await?;
        let schema = version.schema();
        let selection = ClassSelection::parse(&target.classes)?;

        let context = PreDeploymentContext::prepare(
            &*self.api,
            &target.root,
            schema,
            selection,
            target.profile.clone(),
            options.skip_diff_check,
            Arc::clone(&self.limit),
        )
        .await?;
        let summary = context.comparison.summary.clone();

        if mode == Mode::Diff {
            return Ok(Outcome::Compared(summary));
        }

        if !options.force && !is_changed(&summary) {
            info!("No changes detected, nothing to apply");
            return Ok(Outcome::NoChanges);
        }

        if requires_approval(&summary, options.ignore_approval) && !approver.approve(&summary)? {
            warn!("Deployment declined");
            return Err(SyncError::Approval("declined by user".into()));
        }

        let deployer = Deployer::new(self.api, self.events, self.limit, self.cancel);
        let report = deployer
            .deploy(
                &context,
                &DeployOptions {
                    force: options.force,
                    skip_diff_check: options.skip_diff_check,
                    deploy: mode == Mode::Deploy,
                    status_timeout: options.status_timeout,
                },
            )
            .await?;

        Ok(Outcome::Applied { summary, report })
    }
}
