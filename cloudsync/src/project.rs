//! The project descriptor, `cloudobjects.json`, at the project root.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::errors::io_err;
use crate::utils::{Result, SyncError};

pub const PROJECT_FILE: &str = "cloudobjects.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logging_adapters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_stream_targets: Vec<Value>,
}

impl ProjectConfig {
    /// Read the descriptor. A missing file yields the empty descriptor.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(io_err(path, e)),
        };
        serde_json::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("invalid {}: {e}", path.display())))
    }
}

/// First of: command line, profile, project descriptor.
pub fn resolve_project_id(
    cli: Option<&str>,
    profile: Option<&str>,
    project: &ProjectConfig,
) -> Result<String> {
    cli.or(profile)
        .or(project.project_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::Validation(format!(
                "no project id: pass --project-id or set projectId in {PROJECT_FILE}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_camel_case_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            r#"{"projectId": "p-1", "stateStreamTargets": [{"url": "x"}]}"#,
        )
        .unwrap();

        let project = ProjectConfig::load(dir.path()).await.unwrap();
        assert_eq!(project.project_id.as_deref(), Some("p-1"));
        assert_eq!(project.state_stream_targets.len(), 1);
        assert!(project.logging_adapters.is_empty());
    }

    #[tokio::test]
    async fn missing_descriptor_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ProjectConfig::load(dir.path()).await.unwrap(),
            ProjectConfig::default()
        );
    }

    #[tokio::test]
    async fn malformed_descriptor_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "{ nope").unwrap();

        let err = ProjectConfig::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains(PROJECT_FILE));
    }

    #[test]
    fn project_id_precedence() {
        let project = ProjectConfig {
            project_id: Some("from-file".into()),
            ..ProjectConfig::default()
        };
        assert_eq!(
            resolve_project_id(Some("cli"), Some("profile"), &project).unwrap(),
            "cli"
        );
        assert_eq!(
            resolve_project_id(None, Some("profile"), &project).unwrap(),
            "profile"
        );
        assert_eq!(resolve_project_id(None, None, &project).unwrap(), "from-file");
        assert!(matches!(
            resolve_project_id(Some("  "), None, &ProjectConfig::default()),
            Err(SyncError::Validation(_))
        ));
    }
}
