//! Review request monitor
//!
//! Polls one review request until it is merged, closed, fails its checks, or
//! the user cancels. Only a merge triggers cleanup: switching to the base
//! branch and deleting the local feature branch.
//!
//! The monitor never changes the request. It only reads snapshots through a
//! [`RequestSource`] and, at most once, touches the local branch through
//! [`BranchCleanup`].

mod phase;
mod runner;

use std::time::Duration;

use async_trait::async_trait;

use crate::request::{CheckStatus, RequestId, RequestSnapshot, RequestState};
use crate::Result;

pub use phase::MonitorPhase;
pub use runner::{MonitorListener, RequestMonitor};

/// Read access to the hosting service
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Fetch the current state of the request opened from `branch`
    ///
    /// `Ok(None)` means the service has not indexed the request yet. Any
    /// `Err` stops the monitor.
    async fn fetch_request_snapshot(&self, branch: &str) -> Result<Option<RequestSnapshot>>;
}

/// Local branch cleanup performed after a merge
#[async_trait]
pub trait BranchCleanup: Send + Sync {
    /// Check out `branch`
    async fn switch_to(&self, branch: &str) -> Result<()>;

    /// Delete the local branch `name`
    async fn delete_branch(&self, name: &str) -> Result<()>;
}

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Branch to switch to before deleting the feature branch
    pub base_branch: String,
    /// Delay between polls of a visible request
    pub poll_interval: Duration,
    /// Delay between polls while the request is not visible
    pub retry_interval: Duration,
}

/// What a single snapshot means for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Still open with checks pending or passing; poll again
    Continue(CheckStatus),
    Merged,
    Closed,
    CheckFailed,
}

/// Decide what to do with a snapshot
///
/// A missing check roll-up counts as pending.
pub fn evaluate(snapshot: &RequestSnapshot) -> Verdict {
    match snapshot.state {
        RequestState::Merged => Verdict::Merged,
        RequestState::Closed => Verdict::Closed,
        RequestState::Open => match snapshot.effective_check_status() {
            CheckStatus::Failure => Verdict::CheckFailed,
            status @ (CheckStatus::Pending | CheckStatus::Success | CheckStatus::Unknown) => {
                Verdict::Continue(status)
            }
        },
    }
}

/// How monitoring ended, when it did not end in an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Merged; the local branch has been deleted
    Merged { id: RequestId },
    /// Closed without merging; nothing was touched
    Closed { id: RequestId },
    /// Checks failed; the branch is kept so the user can fix it
    CheckFailed { id: RequestId },
    /// Stopped by the user
    Cancelled,
}

impl MonitorOutcome {
    /// Terminal phase this outcome corresponds to
    pub fn phase(&self) -> MonitorPhase {
        match self {
            Self::Merged { .. } => MonitorPhase::DoneMerged,
            Self::Closed { .. } => MonitorPhase::DoneClosed,
            Self::CheckFailed { .. } => MonitorPhase::DoneCheckFailed,
            Self::Cancelled => MonitorPhase::DoneCancelled,
        }
    }

    /// Process exit code for this outcome
    ///
    /// Errors are reported separately and exit with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Merged { .. } => 0,
            Self::Closed { .. } => 2,
            Self::CheckFailed { .. } => 3,
            Self::Cancelled => 130,
        }
    }
}

/// Progress notifications for whoever drives the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The service does not list the request yet
    NotVisible { retry_in: Duration },
    /// The request is open and the monitor will poll again
    Waiting {
        id: RequestId,
        check_status: CheckStatus,
        next_poll: Duration,
    },
    /// The request was merged; cleanup follows
    Merged { id: RequestId },
    /// About to switch to the base branch and delete the feature branch
    CleanupStarted { branch: String, base: String },
    /// Feature branch deleted
    CleanupFinished { branch: String },
    Closed { id: RequestId },
    CheckFailed { id: RequestId },
    Cancelled,
}
