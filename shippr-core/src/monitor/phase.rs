//! Phases of the request monitor's polling loop
//!
//! These describe the loop, not the review request. The request's own state
//! lives in [`RequestState`](crate::RequestState).

use std::fmt;

use crate::{Error, Result};

/// Where the polling loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Request not yet returned by the hosting service
    WaitingForVisibility,
    /// Request visible and being polled
    Polling,
    /// Request merged and the local branch cleaned up
    DoneMerged,
    /// Request closed without merging
    DoneClosed,
    /// Checks failed; left for the user to fix
    DoneCheckFailed,
    /// Fetch or cleanup failed
    DoneError,
    /// Stopped by the user
    DoneCancelled,
}

impl MonitorPhase {
    /// Whether the loop has stopped
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::WaitingForVisibility | Self::Polling)
    }

    /// Check if a transition from this phase to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        use MonitorPhase::*;

        match (*self, to) {
            (WaitingForVisibility, Polling) => true,
            // The request can drop out of the listing again; treat that as
            // not visible yet.
            (Polling, WaitingForVisibility) => true,
            (Polling, DoneMerged | DoneClosed | DoneCheckFailed) => true,
            (WaitingForVisibility | Polling, DoneError | DoneCancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WaitingForVisibility => "waiting-for-visibility",
            Self::Polling => "polling",
            Self::DoneMerged => "done-merged",
            Self::DoneClosed => "done-closed",
            Self::DoneCheckFailed => "done-check-failed",
            Self::DoneError => "done-error",
            Self::DoneCancelled => "done-cancelled",
        };
        f.write_str(s)
    }
}

/// Tracks the current phase and rejects transitions the loop never makes
#[derive(Debug, Clone)]
pub(crate) struct PhaseTracker {
    current: MonitorPhase,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: MonitorPhase::WaitingForVisibility,
        }
    }

    pub(crate) fn current(&self) -> MonitorPhase {
        self.current
    }

    /// Move to `to`, staying put when already there
    pub(crate) fn transition_to(&mut self, to: MonitorPhase) -> Result<()> {
        if self.current == to {
            return Ok(());
        }

        if !self.current.can_transition_to(to) {
            return Err(Error::Other(format!(
                "Invalid monitor transition from {} to {}",
                self.current, to
            )));
        }

        tracing::info!(from = %self.current, to = %to, "Monitor phase transition");

        self.current = to;
        Ok(())
    }
}
