//! CLI settings.
//!
//! Loaded from an optional TOML file (`--config`, else the user's config
//! directory) with `CLOUDSYNC__SECTION__KEY` environment overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::{Result, SyncError};

const ENV_PREFIX: &str = "CLOUDSYNC";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub performance: PerformanceSettings,
    #[serde(default)]
    pub deploy: DeploySettings,
    /// Named endpoint overrides selected with `--profile`.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Platform API base URL
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSettings {
    /// Upper bound on concurrent file reads and remote calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Seconds to wait for a class deployment to finish. 0 waits forever.
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Endpoint after applying the selected profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub token: Option<String>,
    pub project_id: Option<String>,
}

// Default values
fn default_api_url() -> String {
    "https://api.cloudobjects.io".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrency() -> usize {
    16
}

fn default_status_timeout_secs() -> u64 {
    900
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token: None,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            status_timeout_secs: default_status_timeout_secs(),
        }
    }
}

/// `<config_dir>/cloudsync/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cloudsync").join("config.toml"))
}

impl Settings {
    /// Load settings. An explicit path must exist; the default path is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    debug!("Looking for settings in {}", path.display());
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.performance.max_concurrency == 0 {
            return Err(SyncError::Config(
                "performance.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API endpoint, overridden field by field by the named profile.
    pub fn endpoint(&self, profile: Option<&str>) -> Result<Endpoint> {
        let mut endpoint = Endpoint {
            url: self.api.url.clone(),
            token: self.api.token.clone(),
            project_id: None,
        };

        if let Some(name) = profile {
            let overrides = self.profiles.get(name).ok_or_else(|| {
                SyncError::Config(format!("profile {name:?} is not defined"))
            })?;
            if let Some(url) = &overrides.url {
                endpoint.url = url.clone();
            }
            if overrides.token.is_some() {
                endpoint.token = overrides.token.clone();
            }
            endpoint.project_id = overrides.project_id.clone();
        }

        Ok(endpoint)
    }

    /// `None` when the deadline is disabled.
    pub fn status_timeout(&self) -> Option<Duration> {
        match self.deploy.status_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
