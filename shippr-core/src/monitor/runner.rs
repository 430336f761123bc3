//! Polling loop driving a single review request to a terminal outcome

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::phase::{MonitorPhase, PhaseTracker};
use super::{
    evaluate, BranchCleanup, MonitorConfig, MonitorEvent, MonitorOutcome, RequestSource, Verdict,
};
use crate::request::{RequestId, RequestSnapshot};
use crate::{Error, Result};

/// Callback receiving progress events
pub type MonitorListener = Box<dyn Fn(&MonitorEvent) + Send + Sync>;

/// Watches one review request and cleans up its branch after a merge
pub struct RequestMonitor<S, C> {
    source: S,
    cleanup: C,
    config: MonitorConfig,
    expected: Option<RequestId>,
    listener: Option<MonitorListener>,
}

impl<S, C> std::fmt::Debug for RequestMonitor<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMonitor")
            .field("config", &self.config)
            .field("expected", &self.expected)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl<S, C> RequestMonitor<S, C>
where
    S: RequestSource,
    C: BranchCleanup,
{
    pub fn new(source: S, cleanup: C, config: MonitorConfig) -> Self {
        Self {
            source,
            cleanup,
            config,
            expected: None,
            listener: None,
        }
    }

    /// Only accept the request with this id
    ///
    /// Branch names get reused, so the listing for a branch can still show
    /// an older request until the new one is indexed. Any other request is
    /// treated as not visible yet.
    pub fn with_expected_request(mut self, id: impl Into<RequestId>) -> Self {
        self.expected = Some(id.into());
        self
    }

    /// Receive progress events while the monitor runs
    pub fn with_listener(mut self, listener: impl Fn(&MonitorEvent) + Send + Sync + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    fn emit(&self, event: MonitorEvent) {
        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }

    /// Poll the request opened from `branch` until it reaches an outcome
    ///
    /// Returns `Err(Error::Fetch)` as soon as a fetch fails; only a request
    /// that is not visible yet is retried. Cancelling `cancel` stops the loop
    /// during a sleep or fetch without running cleanup.
    pub async fn run(&self, branch: &str, cancel: &CancellationToken) -> Result<MonitorOutcome> {
        let mut phase = PhaseTracker::new();
        info!(
            branch,
            base = %self.config.base_branch,
            poll_interval = ?self.config.poll_interval,
            "Monitoring review request"
        );

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(&mut phase);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(&mut phase),
                fetched = self.source.fetch_request_snapshot(branch) => fetched,
            };

            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(branch, error = %e, "Fetching review request failed");
                    phase.transition_to(MonitorPhase::DoneError)?;
                    return Err(match e {
                        Error::Fetch(_) => e,
                        other => Error::Fetch(other.to_string()),
                    });
                }
            };

            let snapshot = match snapshot {
                Some(s) if self.expected.as_ref().is_some_and(|id| *id != s.id) => {
                    debug!(branch, listed = %s.id, "Listed review request is an older one");
                    None
                }
                other => other,
            };

            let Some(snapshot) = snapshot else {
                phase.transition_to(MonitorPhase::WaitingForVisibility)?;
                debug!(branch, retry_in = ?self.config.retry_interval, "Review request not visible yet");
                self.emit(MonitorEvent::NotVisible {
                    retry_in: self.config.retry_interval,
                });

                if sleep_or_cancel(self.config.retry_interval, cancel).await {
                    return self.cancelled(&mut phase);
                }
                continue;
            };

            phase.transition_to(MonitorPhase::Polling)?;

            match self.handle_snapshot(branch, &snapshot, cancel, &mut phase).await? {
                Some(outcome) => return Ok(outcome),
                None => {
                    if sleep_or_cancel(self.config.poll_interval, cancel).await {
                        return self.cancelled(&mut phase);
                    }
                }
            }
        }
    }

    /// Apply the transition rules to a visible snapshot
    ///
    /// Returns `None` when the loop should poll again.
    async fn handle_snapshot(
        &self,
        branch: &str,
        snapshot: &RequestSnapshot,
        cancel: &CancellationToken,
        phase: &mut PhaseTracker,
    ) -> Result<Option<MonitorOutcome>> {
        let id = snapshot.id.clone();

        match evaluate(snapshot) {
            Verdict::Continue(check_status) => {
                debug!(%id, %check_status, "Review request still open");
                self.emit(MonitorEvent::Waiting {
                    id,
                    check_status,
                    next_poll: self.config.poll_interval,
                });
                Ok(None)
            }
            Verdict::Merged => {
                // A cancel that raced the final fetch wins over cleanup
                if cancel.is_cancelled() {
                    return self.cancelled(phase).map(Some);
                }

                self.emit(MonitorEvent::Merged { id: id.clone() });

                if let Err(e) = self.clean_up(branch).await {
                    phase.transition_to(MonitorPhase::DoneError)?;
                    return Err(e);
                }

                phase.transition_to(MonitorPhase::DoneMerged)?;
                info!(%id, branch, "Review request merged and branch cleaned up");
                Ok(Some(MonitorOutcome::Merged { id }))
            }
            Verdict::Closed => {
                phase.transition_to(MonitorPhase::DoneClosed)?;
                info!(%id, "Review request closed without merging");
                self.emit(MonitorEvent::Closed { id: id.clone() });
                Ok(Some(MonitorOutcome::Closed { id }))
            }
            Verdict::CheckFailed => {
                phase.transition_to(MonitorPhase::DoneCheckFailed)?;
                info!(%id, "Checks failed; leaving branch in place");
                self.emit(MonitorEvent::CheckFailed { id: id.clone() });
                Ok(Some(MonitorOutcome::CheckFailed { id }))
            }
        }
    }

    async fn clean_up(&self, branch: &str) -> Result<()> {
        let base = &self.config.base_branch;
        self.emit(MonitorEvent::CleanupStarted {
            branch: branch.to_string(),
            base: base.clone(),
        });

        let cleanup_error = |e: Error| Error::Cleanup {
            branch: branch.to_string(),
            reason: e.to_string(),
        };

        self.cleanup.switch_to(base).await.map_err(cleanup_error)?;
        self.cleanup
            .delete_branch(branch)
            .await
            .map_err(cleanup_error)?;

        self.emit(MonitorEvent::CleanupFinished {
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn cancelled(&self, phase: &mut PhaseTracker) -> Result<MonitorOutcome> {
        phase.transition_to(MonitorPhase::DoneCancelled)?;
        info!("Monitoring cancelled");
        self.emit(MonitorEvent::Cancelled);
        Ok(MonitorOutcome::Cancelled)
    }
}

/// Sleep for `duration`, returning `true` if cancelled first
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CheckStatus, RequestId, RequestState};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    const POLL: Duration = Duration::from_secs(30);
    const RETRY: Duration = Duration::from_secs(10);

    enum Step {
        Missing,
        Snapshot(RequestState, Option<CheckStatus>),
        /// A different request listed for the same branch
        Other(u64, RequestState),
        Fail(&'static str),
        /// Cancel the token, then return the snapshot
        CancelThen(RequestState),
    }

    #[derive(Clone)]
    struct ScriptedSource {
        steps: Arc<Mutex<VecDeque<Step>>>,
        fetches: Arc<Mutex<Vec<Instant>>>,
        cancel: CancellationToken,
        repeat_last_open: bool,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>, cancel: &CancellationToken) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.into())),
                fetches: Arc::new(Mutex::new(Vec::new())),
                cancel: cancel.clone(),
                repeat_last_open: false,
            }
        }

        /// Keep answering "open, pending" once the script runs out
        fn forever_open(cancel: &CancellationToken) -> Self {
            let mut source = Self::new(Vec::new(), cancel);
            source.repeat_last_open = true;
            source
        }

        fn fetch_times(&self) -> Vec<Instant> {
            self.fetches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RequestSource for ScriptedSource {
        async fn fetch_request_snapshot(&self, branch: &str) -> Result<Option<RequestSnapshot>> {
            assert_eq!(branch, "feature");
            self.fetches.lock().unwrap().push(Instant::now());

            let step = self.steps.lock().unwrap().pop_front();
            let step = match step {
                Some(step) => step,
                None if self.repeat_last_open => Step::Snapshot(RequestState::Open, None),
                None => panic!("fetched after the script ended"),
            };

            match step {
                Step::Missing => Ok(None),
                Step::Snapshot(state, checks) => {
                    let snapshot = RequestSnapshot::new(17u64, state);
                    Ok(Some(match checks {
                        Some(c) => snapshot.with_checks(c),
                        None => snapshot,
                    }))
                }
                Step::Other(number, state) => Ok(Some(RequestSnapshot::new(number, state))),
                Step::Fail(message) => Err(Error::Command {
                    program: "gh".to_string(),
                    args: vec!["pr".to_string(), "list".to_string()],
                    stderr: message.to_string(),
                }),
                Step::CancelThen(state) => {
                    self.cancel.cancel();
                    Ok(Some(RequestSnapshot::new(17u64, state)))
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingCleanup {
        calls: Arc<Mutex<Vec<String>>>,
        fail_delete: bool,
    }

    impl RecordingCleanup {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BranchCleanup for RecordingCleanup {
        async fn switch_to(&self, branch: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("switch:{}", branch));
            Ok(())
        }

        async fn delete_branch(&self, name: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("delete:{}", name));
            if self.fail_delete {
                return Err(Error::Other("branch is checked out elsewhere".to_string()));
            }
            Ok(())
        }
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            base_branch: "master".to_string(),
            poll_interval: POLL,
            retry_interval: RETRY,
        }
    }

    fn monitor(
        source: &ScriptedSource,
        cleanup: &RecordingCleanup,
    ) -> RequestMonitor<ScriptedSource, RecordingCleanup> {
        RequestMonitor::new(source.clone(), cleanup.clone(), config())
    }

    fn gaps(times: &[Instant]) -> Vec<Duration> {
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_visible_then_merged() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Missing,
                Step::Missing,
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Pending)),
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Success)),
                Step::Snapshot(RequestState::Merged, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MonitorOutcome::Merged {
                id: RequestId::from(17u64)
            }
        );
        assert_eq!(cleanup.calls(), vec!["switch:master", "delete:feature"]);
        assert_eq!(
            gaps(&source.fetch_times()),
            vec![RETRY, RETRY, POLL, POLL]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_then_closed_skips_cleanup() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Pending)),
                Step::Snapshot(RequestState::Closed, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::Closed { .. }));
        assert!(cleanup.calls().is_empty());
        assert_eq!(source.fetch_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_failure_stops_immediately() {
        let cancel = CancellationToken::new();
        // The script ends after one step, so any further poll panics
        let source = ScriptedSource::new(
            vec![Step::Snapshot(RequestState::Open, Some(CheckStatus::Failure))],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();
        let start = Instant::now();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::CheckFailed { .. }));
        assert_eq!(outcome.exit_code(), 3);
        assert!(cleanup.calls().is_empty());
        assert_eq!(source.fetch_times().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_is_fatal() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Missing,
                Step::Fail("HTTP 401: Bad credentials"),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let result = monitor(&source, &cleanup).run("feature", &cancel).await;

        match result {
            Err(Error::Fetch(message)) => assert!(message.contains("Bad credentials")),
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert!(cleanup.calls().is_empty());
        assert_eq!(source.fetch_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_checks_keep_polling() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Snapshot(RequestState::Open, None),
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Unknown)),
                Step::Snapshot(RequestState::Merged, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::Merged { .. }));
        assert_eq!(cleanup.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_dropping_out_of_listing_is_retried() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Snapshot(RequestState::Open, None),
                Step::Missing,
                Step::Snapshot(RequestState::Closed, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::Closed { .. }));
        assert_eq!(gaps(&source.fetch_times()), vec![POLL, RETRY]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::forever_open(&cancel);
        let cleanup = RecordingCleanup::default();
        let monitor = monitor(&source, &cleanup);
        let start = Instant::now();

        let canceller = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(45)).await;
                cancel.cancel();
            }
        };

        let (outcome, ()) = tokio::join!(monitor.run("feature", &cancel), canceller);

        assert_eq!(outcome.unwrap(), MonitorOutcome::Cancelled);
        // Stopped mid-sleep instead of waiting for the poll at 60s
        assert_eq!(start.elapsed(), Duration::from_secs(45));
        assert_eq!(source.fetch_times().len(), 2);
        assert!(cleanup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_not_visible() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![Step::Missing, Step::Missing], &cancel);
        let cleanup = RecordingCleanup::default();
        let monitor = monitor(&source, &cleanup);

        let canceller = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(15)).await;
                cancel.cancel();
            }
        };

        let (outcome, ()) = tokio::join!(monitor.run("feature", &cancel), canceller);

        assert_eq!(outcome.unwrap(), MonitorOutcome::Cancelled);
        assert_eq!(source.fetch_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_racing_merge_skips_cleanup() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![Step::CancelThen(RequestState::Merged)], &cancel);
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert_eq!(outcome, MonitorOutcome::Cancelled);
        assert!(cleanup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_racing_merge_reports_only_cancel() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![Step::CancelThen(RequestState::Merged)], &cancel);
        let cleanup = RecordingCleanup::default();
        let events = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&events);
        let monitor = monitor(&source, &cleanup)
            .with_listener(move |event| recorded.lock().unwrap().push(event.clone()));
        monitor.run("feature", &cancel).await.unwrap();

        assert_eq!(*events.lock().unwrap(), vec![MonitorEvent::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_request_on_same_branch_is_not_visible() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Other(5, RequestState::Merged),
                Step::Other(5, RequestState::Merged),
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Success)),
                Step::Snapshot(RequestState::Merged, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .with_expected_request(17u64)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MonitorOutcome::Merged {
                id: RequestId::from(17u64)
            }
        );
        assert_eq!(cleanup.calls(), vec!["switch:master", "delete:feature"]);
        assert_eq!(gaps(&source.fetch_times()), vec![RETRY, RETRY, POLL]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_closed_request_does_not_end_watch() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Other(5, RequestState::Closed),
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Failure)),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .with_expected_request(17u64)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::CheckFailed { id } if id == RequestId::from(17u64)));
        assert!(cleanup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_fetches() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(Vec::new(), &cancel);
        let cleanup = RecordingCleanup::default();

        let outcome = monitor(&source, &cleanup)
            .run("feature", &cancel)
            .await
            .unwrap();

        assert_eq!(outcome, MonitorOutcome::Cancelled);
        assert!(source.fetch_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_failure_is_reported() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![Step::Snapshot(RequestState::Merged, None)], &cancel);
        let cleanup = RecordingCleanup {
            fail_delete: true,
            ..Default::default()
        };

        let result = monitor(&source, &cleanup).run("feature", &cancel).await;

        assert!(matches!(result, Err(Error::Cleanup { branch, .. }) if branch == "feature"));
        assert_eq!(cleanup.calls(), vec!["switch:master", "delete:feature"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_sees_events_in_order() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Step::Missing,
                Step::Snapshot(RequestState::Open, Some(CheckStatus::Success)),
                Step::Snapshot(RequestState::Merged, None),
            ],
            &cancel,
        );
        let cleanup = RecordingCleanup::default();
        let events = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&events);
        let monitor = monitor(&source, &cleanup)
            .with_listener(move |event| recorded.lock().unwrap().push(event.clone()));
        monitor.run("feature", &cancel).await.unwrap();

        let id = RequestId::from(17u64);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                MonitorEvent::NotVisible { retry_in: RETRY },
                MonitorEvent::Waiting {
                    id: id.clone(),
                    check_status: CheckStatus::Success,
                    next_poll: POLL,
                },
                MonitorEvent::Merged { id },
                MonitorEvent::CleanupStarted {
                    branch: "feature".to_string(),
                    base: "master".to_string(),
                },
                MonitorEvent::CleanupFinished {
                    branch: "feature".to_string(),
                },
            ]
        );
    }
}
