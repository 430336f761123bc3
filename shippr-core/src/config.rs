//! Configuration management for shippr
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (SHIPPR_*)
//! 3. Config file (~/.config/shippr/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::MonitorConfig;
use crate::{Error, Result};

/// Repository-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Branch that review requests merge into
    pub base_branch: String,

    /// Remote to push to and compare against
    pub remote: String,

    /// Labels attached to every created request
    pub labels: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            base_branch: "master".to_string(),
            remote: "origin".to_string(),
            labels: vec!["automerge".to_string()],
        }
    }
}

/// Request monitor timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Delay between polls of a visible request
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Delay between polls while the request is not yet visible
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            retry_interval: Duration::from_secs(10),
        }
    }
}

/// Paths to the external tools
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the git executable
    pub git_path: String,

    /// Path to the GitHub CLI executable
    pub gh_path: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git_path: "git".to_string(),
            gh_path: "gh".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Repository configuration
    pub repo: RepoConfig,

    /// Monitor timing
    pub monitor: MonitorSettings,

    /// External tool paths
    pub tools: ToolsConfig,
}

/// Values that can be overridden from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_branch: Option<String>,
    pub remote: Option<String>,
    pub labels: Option<Vec<String>>,
    pub poll_interval: Option<Duration>,
    pub retry_interval: Option<Duration>,
    pub git_path: Option<String>,
    pub gh_path: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/shippr/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shippr").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - SHIPPR_BASE_BRANCH
    /// - SHIPPR_REMOTE
    /// - SHIPPR_LABEL: comma separated list of labels
    /// - SHIPPR_GIT_PATH
    /// - SHIPPR_GH_PATH
    /// - SHIPPR_POLL_INTERVAL: humantime duration, e.g. "30s"
    /// - SHIPPR_RETRY_INTERVAL: humantime duration
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base) = var("SHIPPR_BASE_BRANCH") {
            self.repo.base_branch = base;
        }

        if let Some(remote) = var("SHIPPR_REMOTE") {
            self.repo.remote = remote;
        }

        if let Some(labels) = var("SHIPPR_LABEL") {
            self.repo.labels = labels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(path) = var("SHIPPR_GIT_PATH") {
            self.tools.git_path = path;
        }

        if let Some(path) = var("SHIPPR_GH_PATH") {
            self.tools.gh_path = path;
        }

        if let Some(value) = var("SHIPPR_POLL_INTERVAL") {
            self.monitor.poll_interval = parse_duration("SHIPPR_POLL_INTERVAL", &value)?;
        }

        if let Some(value) = var("SHIPPR_RETRY_INTERVAL") {
            self.monitor.retry_interval = parse_duration("SHIPPR_RETRY_INTERVAL", &value)?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(base) = overrides.base_branch {
            self.repo.base_branch = base;
        }

        if let Some(remote) = overrides.remote {
            self.repo.remote = remote;
        }

        if let Some(labels) = overrides.labels {
            self.repo.labels = labels;
        }

        if let Some(interval) = overrides.poll_interval {
            self.monitor.poll_interval = interval;
        }

        if let Some(interval) = overrides.retry_interval {
            self.monitor.retry_interval = interval;
        }

        if let Some(path) = overrides.git_path {
            self.tools.git_path = path;
        }

        if let Some(path) = overrides.gh_path {
            self.tools.gh_path = path;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults. An explicit `config_path`
    /// replaces the default file location and must exist.
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides()?.with_cli_overrides(overrides))
    }

    /// Monitor settings bound to the configured base branch
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            base_branch: self.repo.base_branch.clone(),
            poll_interval: self.monitor.poll_interval,
            retry_interval: self.monitor.retry_interval,
        }
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| Error::Config(format!("Invalid duration in {}='{}': {}", key, value, e)))
}
