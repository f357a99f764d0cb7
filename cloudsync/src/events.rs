//! Per-item deployment status events.
//!
//! The orchestrator publishes on an [`EventBus`]; the reporter and tests
//! subscribe. Publishing never blocks and never fails the deployment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Maximum number of queued events per subscriber
const EVENT_CAPACITY: usize = 1024;

/// What a status event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Dependency,
    CreateClass,
    ClassFiles,
    Model,
    ProjectFiles,
    Deploy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Pending,
    Done,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployEvent {
    pub kind: EventKind,
    pub name: String,
    #[serde(flatten)]
    pub status: ItemStatus,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast channel for deployment events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeployEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, kind: EventKind, name: &str, status: ItemStatus) {
        let event = DeployEvent {
            kind,
            name: name.to_string(),
            status,
            timestamp: Utc::now(),
        };
        match self.tx.send(event) {
            Ok(count) => trace!("Published event to {} subscriber(s)", count),
            Err(e) => debug!("No subscribers for event: {:?}", e.0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeployEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
