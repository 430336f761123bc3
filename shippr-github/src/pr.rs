//! Pull request creation and status lookup

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shippr_core::{CheckStatus, RequestSnapshot, RequestSource, RequestState};
use tracing::{debug, info};

use crate::{Error, GhClient, Result};

/// Fields requested from `gh pr list --json`
const SNAPSHOT_FIELDS: &str = "number,state,statusCheckRollup";

/// A pull request to be opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    /// Branch to merge into
    pub base: String,
    /// Branch with the changes
    pub head: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// A pull request that was just created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPullRequest {
    /// Web URL printed by gh
    pub url: String,
    /// PR number, when the URL ends in one
    pub number: Option<u64>,
}

/// One entry of `gh pr list --json number,state,statusCheckRollup`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    state: String,
    #[serde(default)]
    status_check_rollup: Option<Rollup>,
}

/// Check roll-up as gh reports it: normally a list of checks, but older
/// versions and some wrappers print a single summary string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Rollup {
    Summary(String),
    Checks(Vec<GhCheck>),
}

/// Either a check run (`status` + `conclusion`) or a commit status context
/// (`state`)
#[derive(Debug, Deserialize)]
struct GhCheck {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl GhCheck {
    fn check_status(&self) -> CheckStatus {
        if let Some(state) = self.state.as_deref() {
            return CheckStatus::from_conclusion(state);
        }

        match self.status.as_deref() {
            Some(status) if status.eq_ignore_ascii_case("COMPLETED") => self
                .conclusion
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(CheckStatus::from_conclusion)
                .unwrap_or(CheckStatus::Unknown),
            Some(_) => CheckStatus::Pending,
            None => CheckStatus::Unknown,
        }
    }
}

impl Rollup {
    fn check_status(&self) -> Option<CheckStatus> {
        match self {
            Rollup::Summary(s) if s.is_empty() => None,
            Rollup::Summary(s) => Some(CheckStatus::from_conclusion(s)),
            Rollup::Checks(checks) => CheckStatus::aggregate(checks.iter().map(GhCheck::check_status)),
        }
    }
}

impl TryFrom<GhPullRequest> for RequestSnapshot {
    type Error = Error;

    fn try_from(pr: GhPullRequest) -> Result<Self> {
        let state = pr
            .state
            .parse::<RequestState>()
            .map_err(|e: shippr_core::Error| Error::Parse(e.to_string()))?;

        let snapshot = RequestSnapshot::new(pr.number, state);
        Ok(match pr.status_check_rollup.and_then(|r| r.check_status()) {
            Some(status) => snapshot.with_checks(status),
            None => snapshot,
        })
    }
}

/// Parse `gh pr list --json` output into the first listed request
///
/// Empty output or an empty array means the request is not visible yet.
fn parse_snapshot(output: &str) -> Result<Option<RequestSnapshot>> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(None);
    }

    let prs: Vec<GhPullRequest> = serde_json::from_str(output)?;
    prs.into_iter()
        .next()
        .map(RequestSnapshot::try_from)
        .transpose()
}

/// Extract the PR number from a URL like `https://github.com/o/r/pull/12`
fn parse_pr_number(url: &str) -> Option<u64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

impl GhClient {
    /// Open a pull request
    pub async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<CreatedPullRequest> {
        debug!(head = %pr.head, base = %pr.base, title = %pr.title, "Creating pull request");

        let mut args: Vec<&str> = vec![
            "pr",
            "create",
            "--base",
            pr.base.as_str(),
            "--head",
            pr.head.as_str(),
            "--title",
            pr.title.as_str(),
            "--body",
            pr.body.as_str(),
        ];
        for label in &pr.labels {
            args.push("--label");
            args.push(label.as_str());
        }

        let output = self.run(&args).await?;
        let url = output
            .lines()
            .rev()
            .find(|line| line.starts_with("http"))
            .unwrap_or(&output)
            .to_string();
        let number = parse_pr_number(&url);

        info!(url = %url, ?number, "Created pull request");

        Ok(CreatedPullRequest { url, number })
    }

    /// Fetch the current state of the pull request opened from `branch`
    pub async fn pull_request_snapshot(&self, branch: &str) -> Result<Option<RequestSnapshot>> {
        let output = self
            .run(&[
                "pr",
                "list",
                "--head",
                branch,
                "--state",
                "all",
                "--limit",
                "1",
                "--json",
                SNAPSHOT_FIELDS,
            ])
            .await?;

        let snapshot = parse_snapshot(&output)?;
        debug!(
            branch,
            state = ?snapshot.as_ref().map(|s| s.state),
            checks = ?snapshot.as_ref().and_then(|s| s.check_status),
            "Fetched pull request snapshot"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl RequestSource for GhClient {
    async fn fetch_request_snapshot(
        &self,
        branch: &str,
    ) -> shippr_core::Result<Option<RequestSnapshot>> {
        self.pull_request_snapshot(branch)
            .await
            .map_err(|e| shippr_core::Error::Fetch(e.to_string()))
    }
}
