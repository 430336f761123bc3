//! Git operations performed by shelling out to the git executable
//!
//! Anything that talks to a remote or changes the working tree goes through
//! the user's own git so that credentials, hooks and config apply as usual.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::monitor::BranchCleanup;
use crate::{Error, Result};

/// Thin wrapper around the `git` command line client
#[derive(Debug, Clone)]
pub struct GitCli {
    git_path: String,
    workdir: PathBuf,
}

impl GitCli {
    /// Run git in `workdir` using the executable found on PATH
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            git_path: "git".to_string(),
            workdir: workdir.into(),
        }
    }

    /// Use a custom path to the git executable
    pub fn with_git_path(mut self, path: impl Into<String>) -> Self {
        self.git_path = path.into();
        self
    }

    /// Check whether the git executable can be run
    pub async fn is_available(&self) -> bool {
        Command::new(&self.git_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(git = %self.git_path, ?args, workdir = %self.workdir.display(), "Running git");

        let output = Command::new(&self.git_path)
            .args(args)
            .current_dir(&self.workdir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ToolNotFound(self.git_path.clone())
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(Error::Command {
                program: self.git_path.clone(),
                args: args.iter().map(|a| a.to_string()).collect(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Push a branch and set it as the upstream of the local branch
    pub async fn push_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", "--set-upstream", remote, branch]).await?;
        info!(remote, branch, "Pushed branch");
        Ok(())
    }

    /// Refresh the remote tracking ref for a single branch
    pub async fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["fetch", remote, branch]).await?;
        debug!(remote, branch, "Fetched branch");
        Ok(())
    }

    /// Check out an existing branch
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", branch]).await?;
        info!(branch, "Checked out branch");
        Ok(())
    }

    /// Force-delete a local branch
    pub async fn force_delete_branch(&self, branch: &str) -> Result<()> {
        self.run(&["branch", "-D", branch]).await?;
        info!(branch, "Deleted local branch");
        Ok(())
    }
}

#[async_trait]
impl BranchCleanup for GitCli {
    async fn switch_to(&self, branch: &str) -> Result<()> {
        self.checkout(branch).await
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        self.force_delete_branch(name).await
    }
}
