//! Shared plumbing for commands that run the request monitor

use std::process::ExitCode;

use shippr_core::{Config, GitCli, MonitorEvent, MonitorOutcome, RequestMonitor};
use shippr_github::GhClient;
use tokio_util::sync::CancellationToken;

/// Fail early when git or gh cannot be run
pub async fn ensure_tools(git: &GitCli, gh: &GhClient, config: &Config) -> anyhow::Result<()> {
    if !git.is_available().await {
        anyhow::bail!(
            "git not found at '{}'. Make sure git and gh are installed.",
            config.tools.git_path
        );
    }

    if !gh.is_available().await {
        anyhow::bail!(
            "gh not found at '{}'. Make sure git and gh are installed.",
            config.tools.gh_path
        );
    }

    Ok(())
}

/// Watch the pull request for `branch` until it reaches an outcome
///
/// With `number` set, other pull requests listed for the same branch are
/// ignored. Ctrl+C stops watching without touching the branch.
pub async fn watch_pull_request(
    config: &Config,
    git: GitCli,
    gh: GhClient,
    branch: &str,
    number: Option<u64>,
) -> anyhow::Result<ExitCode> {
    println!();
    println!("Watching the pull request for '{}'.", branch);
    println!("Press Ctrl+C to stop watching at any time.");

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel.cancel(),
                Err(e) => tracing::warn!(error = %e, "Unable to listen for Ctrl+C"),
            }
        })
    };

    let mut monitor =
        RequestMonitor::new(gh, git, config.monitor_config()).with_listener(print_event);
    if let Some(number) = number {
        monitor = monitor.with_expected_request(number);
    }
    let result = monitor.run(branch, &cancel).await;
    ctrl_c.abort();

    match result {
        Ok(outcome) => {
            if let MonitorOutcome::Merged { .. } = outcome {
                println!("Local branch '{}' deleted. All done.", branch);
            }
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Err(e) => {
            eprintln!();
            eprintln!("Error while watching: {}", e);
            eprintln!("Stopped watching.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::NotVisible { retry_in } => println!(
            "Pull request not found yet; it may not be indexed. Retrying in {}...",
            humantime::format_duration(*retry_in)
        ),
        MonitorEvent::Waiting {
            id,
            check_status,
            next_poll,
        } => println!(
            "PR {} is open, checks {}. Waiting for merge... (next check in {})",
            id,
            check_status.to_string().to_lowercase(),
            humantime::format_duration(*next_poll)
        ),
        MonitorEvent::Merged { id } => println!("PR {} has been merged!", id),
        MonitorEvent::CleanupStarted { branch, base } => {
            println!("Switching to '{}' and deleting '{}'...", base, branch)
        }
        MonitorEvent::CleanupFinished { .. } => {}
        MonitorEvent::Closed { id } => {
            println!("PR {} was closed without merging. The local branch is kept.", id)
        }
        MonitorEvent::CheckFailed { id } => {
            println!("Checks failed on PR {}. Automatic cleanup cancelled.", id);
            println!("Please review the pull request and fix the problems.");
        }
        MonitorEvent::Cancelled => {
            println!();
            println!("Stopped watching at your request.");
        }
    }
}
