//! Deployment status stream.
//!
//! After a class deploy is triggered the platform pushes status transitions
//! `started -> ongoing -> finished | failed`. [`wait_for_deployment`] blocks on
//! that stream until a terminal state, the deadline, or cancellation.

pub mod client;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::{Result, SyncError};

/// Maximum number of queued status messages per deployment
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Receiving end of a deployment's status stream.
pub type StatusReceiver = mpsc::Receiver<DeployStatusEvent>;

/// Status transitions pushed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Started,
    Ongoing,
    Finished,
    Failed,
}

impl DeployStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployStatus::Finished | DeployStatus::Failed)
    }
}

/// One message on the status stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStatusEvent {
    pub status: DeployStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeployStatusEvent {
    pub fn new(status: DeployStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: DeployStatus::Failed,
            message: Some(message.into()),
        }
    }
}

/// Wait until the deployment of `class` finishes.
///
/// `timeout` of `None` waits indefinitely; `cancel` always interrupts.
pub async fn wait_for_deployment(
    class: &str,
    mut rx: StatusReceiver,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<()> {
    let watch = async {
        while let Some(event) = rx.recv().await {
            match event.status {
                DeployStatus::Started => info!("Deployment of {} started", class),
                DeployStatus::Ongoing => debug!("Deployment of {} ongoing", class),
                DeployStatus::Finished => {
                    info!("Deployment of {} finished", class);
                    return Ok(());
                }
                DeployStatus::Failed => {
                    return Err(SyncError::DeployFailed {
                        class: class.to_string(),
                        message: event
                            .message
                            .unwrap_or_else(|| "no status message".to_string()),
                    });
                }
            }
        }
        Err(SyncError::StatusStreamClosed(class.to_string()))
    };

    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, watch).await.map_err(|_| {
                SyncError::DeployTimeout {
                    class: class.to_string(),
                    secs: limit.as_secs(),
                }
            })?,
            None => watch.await,
        }
    };

    tokio::select! {
        result = bounded => result,
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
    }
}
