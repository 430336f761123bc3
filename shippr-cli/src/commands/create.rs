//! Create command - push the current branch and open a pull request

use std::process::ExitCode;

use clap::Args;
use shippr_core::{Config, GitCli, GitRepo, RequestContent};
use shippr_github::{GhClient, NewPullRequest};

use super::monitor::{ensure_tools, watch_pull_request};
use super::prompt;

/// Arguments for the create command
#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Label to add to the pull request (repeatable; replaces configured labels)
    #[arg(short, long = "label")]
    pub label: Vec<String>,

    /// Open the pull request without any labels
    #[arg(long, conflicts_with = "label")]
    pub no_label: bool,

    /// Watch the pull request and delete the branch after merge without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Do not offer to watch the pull request
    #[arg(long, conflicts_with = "yes")]
    pub no_watch: bool,

    /// Show the pull request that would be opened without pushing or creating it
    #[arg(long)]
    pub dry_run: bool,
}

impl CreateArgs {
    /// Label override from the command line, if any
    pub fn labels(&self) -> Option<Vec<String>> {
        if self.no_label {
            Some(Vec::new())
        } else if self.label.is_empty() {
            None
        } else {
            Some(self.label.clone())
        }
    }

    /// Execute the create command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<ExitCode> {
        let workdir = std::env::current_dir()?;
        let git = GitCli::new(&workdir).with_git_path(&config.tools.git_path);
        let gh = GhClient::new()
            .with_gh_path(&config.tools.gh_path)
            .with_workdir(&workdir);

        ensure_tools(&git, &gh, config).await?;

        let repo = GitRepo::open(&workdir)?;
        let base = config.repo.base_branch.as_str();
        let remote = config.repo.remote.as_str();
        let branch = repo.feature_branch(base)?;
        let remote_info = repo.remote(remote)?;

        tracing::debug!(
            branch = %branch,
            base,
            remote = %remote_info.name,
            url = %remote_info.url,
            root = %repo.root().display(),
            "Preparing pull request"
        );

        if self.dry_run {
            println!("[Dry run] Skipping push of '{}'", branch);
        } else {
            println!("Pushing '{}' to {}...", branch, remote);
            git.push_upstream(remote, &branch).await?;
            println!("Branch is up to date on {}.", remote);
        }

        println!("Fetching '{}' from {}...", base, remote);
        git.fetch(remote, base).await?;

        let commits = repo.commits_ahead(remote, base)?;
        let content = RequestContent::from_commits(&branch, base, &commits)?;

        let request = NewPullRequest {
            base: base.to_string(),
            head: branch.clone(),
            title: content.title,
            body: content.body,
            labels: config.repo.labels.clone(),
        };
        print_summary(&request);

        if self.dry_run {
            println!("[Dry run] Would create the pull request above");
            return Ok(ExitCode::SUCCESS);
        }

        let created = gh.create_pull_request(&request).await?;
        println!("Pull request created: {}", created.url);

        let watch = if self.no_watch {
            false
        } else if self.yes {
            true
        } else {
            tokio::task::spawn_blocking(|| {
                prompt::confirm("\nDelete the local branch after the pull request is merged?")
            })
            .await??
        };

        if !watch {
            println!("Done. Remember to delete the branch manually once it is merged.");
            return Ok(ExitCode::SUCCESS);
        }

        watch_pull_request(config, git, gh, &branch, created.number).await
    }
}

fn print_summary(request: &NewPullRequest) {
    println!();
    println!("Pull Request");
    println!("============");
    println!("  Branch: {} -> {}", request.head, request.base);
    println!("  Title:  {}", request.title);
    if !request.labels.is_empty() {
        println!("  Labels: {}", request.labels.join(", "));
    }
    println!("--- Body ---");
    println!("{}", request.body);
    println!("------------");
    println!();
}
