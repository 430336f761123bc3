//! Runner for the `gh` command line client

use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// GitHub access through the user's authenticated `gh` installation
#[derive(Debug, Clone)]
pub struct GhClient {
    gh_path: String,
    workdir: Option<PathBuf>,
}

impl GhClient {
    /// Create a client using `gh` from PATH in the current directory
    pub fn new() -> Self {
        Self {
            gh_path: "gh".to_string(),
            workdir: None,
        }
    }

    /// Use a custom path to the gh executable
    pub fn with_gh_path(mut self, path: impl Into<String>) -> Self {
        self.gh_path = path.into();
        self
    }

    /// Run gh inside the given repository checkout
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Check whether the gh executable can be run
    pub async fn is_available(&self) -> bool {
        Command::new(&self.gh_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run gh and return its trimmed standard output
    pub(crate) async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(gh = %self.gh_path, ?args, "Running gh");

        let mut cmd = Command::new(&self.gh_path);
        cmd.args(args).kill_on_drop(true);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotInstalled(self.gh_path.clone())
            } else {
                Error::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(Error::Command {
                args: args.iter().map(|a| a.to_string()).collect(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GhClient {
    fn default() -> Self {
        Self::new()
    }
}
