//! Review request snapshot model
//!
//! The hosting service owns the review request. Everything here is a
//! read-only view of it, taken once per poll and never cached.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque identifier of a review request, displayed as `#<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for RequestId {
    fn from(number: u64) -> Self {
        Self(number.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a review request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestState {
    Open,
    Merged,
    Closed,
}

impl FromStr for RequestState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            "CLOSED" => Ok(Self::Closed),
            other => Err(Error::Parse(format!("Unknown request state: {}", other))),
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Aggregate result of the automated checks on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pending,
    Success,
    Failure,
    Unknown,
}

impl CheckStatus {
    /// Map a single check conclusion or status-context state
    pub fn from_conclusion(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "SUCCESS" | "NEUTRAL" | "SKIPPED" => Self::Success,
            "FAILURE" | "ERROR" | "CANCELLED" | "TIMED_OUT" | "ACTION_REQUIRED"
            | "STARTUP_FAILURE" => Self::Failure,
            "PENDING" | "EXPECTED" | "QUEUED" | "IN_PROGRESS" | "WAITING" | "REQUESTED" => {
                Self::Pending
            }
            _ => Self::Unknown,
        }
    }

    /// Combine several check results into one
    ///
    /// Any failure wins, then anything still running, then anything not
    /// understood. Returns `None` when there are no checks at all.
    pub fn aggregate(statuses: impl IntoIterator<Item = CheckStatus>) -> Option<Self> {
        let mut result: Option<Self> = None;

        for status in statuses {
            let rank = |s: Self| match s {
                Self::Success => 0,
                Self::Unknown => 1,
                Self::Pending => 2,
                Self::Failure => 3,
            };

            result = match result {
                Some(current) if rank(current) >= rank(status) => Some(current),
                _ => Some(status),
            };
        }

        result
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Request identifier
    pub id: RequestId,
    /// Lifecycle state
    pub state: RequestState,
    /// Check roll-up; only meaningful while open
    pub check_status: Option<CheckStatus>,
    /// When this snapshot was taken
    pub observed_at: DateTime<Utc>,
}

impl RequestSnapshot {
    pub fn new(id: impl Into<RequestId>, state: RequestState) -> Self {
        Self {
            id: id.into(),
            state,
            check_status: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_checks(mut self, status: CheckStatus) -> Self {
        self.check_status = Some(status);
        self
    }

    /// Check status with an absent roll-up read as pending
    ///
    /// This cannot tell "no checks configured" apart from "checks not
    /// reported yet"; both keep the monitor waiting.
    pub fn effective_check_status(&self) -> CheckStatus {
        self.check_status.unwrap_or(CheckStatus::Pending)
    }
}
