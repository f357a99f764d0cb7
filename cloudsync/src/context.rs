//! Everything one deploy, save or diff run needs to know up front.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use crate::api::Api;
use crate::diff::{diff, Comparison};
use crate::fetch::{fetch_local, fetch_remote, ClassSelection};
use crate::schema::EntitySchema;
use crate::snapshot::ProjectSnapshot;
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct PreDeploymentContext {
    pub schema: &'static EntitySchema,
    pub local: ProjectSnapshot,
    pub remote: ProjectSnapshot,
    pub comparison: Comparison,
    /// Configuration profile the run was started with, for log context.
    pub profile: Option<String>,
    pub selection: ClassSelection,
}

impl PreDeploymentContext {
    /// Fetch both sides concurrently and diff them.
    pub async fn prepare(
        api: &dyn Api,
        root: &Path,
        schema: &'static EntitySchema,
        selection: ClassSelection,
        profile: Option<String>,
        skip_diff: bool,
        limit: Arc<Semaphore>,
    ) -> Result<Self> {
        info!(
            "Comparing {} against remote ({:?}, classes: {})",
            root.display(),
            schema.version,
            selection.describe()
        );

        let (local, remote) = tokio::try_join!(
            fetch_local(root, schema, &selection, Arc::clone(&limit)),
            fetch_remote(api, schema, &selection, limit),
        )?;

        let comparison = diff(&local, &remote, schema, skip_diff);
        info!(
            "{} changed entit{}",
            comparison.summary.entity_count(),
            if comparison.summary.entity_count() == 1 { "y" } else { "ies" }
        );

        Ok(Self {
            schema,
            local,
            remote,
            comparison,
            profile,
            selection,
        })
    }

    /// The comparison the orchestrator acts on: a full skip-diff comparison
    /// when forcing, the stored one otherwise.
    pub fn plan_comparison(&self, force: bool) -> Comparison {
        if force {
            diff(&self.local, &self.remote, self.schema, true)
        } else {
            self.comparison.clone()
        }
    }
}
