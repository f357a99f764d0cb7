//! Error types for cloudsync.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Failed to fetch remote content for {what}: {source}")]
    RemoteFetch {
        what: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Deployment of {item} failed: {source}")]
    Deploy {
        item: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Class {class} failed to deploy: {message}")]
    DeployFailed { class: String, message: String },

    #[error("Timed out after {secs}s waiting for class {class} to deploy")]
    DeployTimeout { class: String, secs: u64 },

    #[error("Status stream for class {0} closed before the deployment finished")]
    StatusStreamClosed(String),

    #[error("Deployment rejected: {0}")]
    Approval(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

impl SyncError {
    /// Wrap an error raised while applying a single deployment item.
    pub(crate) fn deploy(item: impl Into<String>, source: SyncError) -> Self {
        SyncError::Deploy {
            item: item.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while fetching remote content.
    pub(crate) fn remote_fetch(what: impl Into<String>, source: SyncError) -> Self {
        SyncError::RemoteFetch {
            what: what.into(),
            source: Box::new(source),
        }
    }
}
