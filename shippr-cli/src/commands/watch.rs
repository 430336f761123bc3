//! Watch command - monitor an existing pull request

use std::process::ExitCode;

use clap::Args;
use shippr_core::{Config, GitCli, GitRepo};
use shippr_github::GhClient;

use super::monitor::{ensure_tools, watch_pull_request};

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Branch whose pull request to watch (defaults to the current branch)
    pub branch: Option<String>,

    /// Number of the pull request; older ones from the same branch are ignored
    #[arg(long = "pr", value_name = "NUMBER")]
    pub number: Option<u64>,
}

impl WatchArgs {
    /// Execute the watch command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<ExitCode> {
        let workdir = std::env::current_dir()?;
        let git = GitCli::new(&workdir).with_git_path(&config.tools.git_path);
        let gh = GhClient::new()
            .with_gh_path(&config.tools.gh_path)
            .with_workdir(&workdir);

        ensure_tools(&git, &gh, config).await?;

        let branch = match &self.branch {
            Some(branch) if branch == &config.repo.base_branch => {
                anyhow::bail!("Refusing to watch base branch '{}'", branch)
            }
            Some(branch) => branch.clone(),
            None => GitRepo::open(&workdir)?.feature_branch(&config.repo.base_branch)?,
        };

        watch_pull_request(config, git, gh, &branch, self.number).await
    }
}
