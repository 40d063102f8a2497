//! Run status polling.
//!
//! Fetches the run status at a fixed interval until it reaches a terminal
//! state. The wait is bounded by a timeout and checks the cancellation token
//! on every iteration, both while fetching and while sleeping.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{AssistantError, RunStatus};

/// Default interval between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on the total wait for a run.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// How often and for how long to poll a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

/// A run status as observed by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    /// Provider `(code, message)` for failed runs.
    pub last_error: Option<(String, String)>,
}

impl RunSnapshot {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            last_error: None,
        }
    }
}

/// How a run finished successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    RequiresAction,
}

/// Poll `fetch` until the run reaches a terminal status.
///
/// `queued` and `in_progress` keep waiting. `completed` and
/// `requires_action` end the wait successfully; `failed` carries the
/// provider's code and message; every other status is a terminal error.
pub async fn wait_for_run<F, Fut>(
    mut fetch: F,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<RunOutcome, AssistantError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RunSnapshot, AssistantError>>,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssistantError::Cancelled),
            snapshot = fetch() => snapshot?,
        };
        trace!(status = %snapshot.status, "run status");

        match snapshot.status {
            RunStatus::Queued | RunStatus::InProgress => {}
            RunStatus::Completed => return Ok(RunOutcome::Completed),
            RunStatus::RequiresAction => return Ok(RunOutcome::RequiresAction),
            RunStatus::Failed => {
                let (code, message) = snapshot.last_error.unwrap_or_default();
                return Err(AssistantError::RunFailed { code, message });
            }
            other => return Err(AssistantError::RunTerminated(other)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(AssistantError::Timeout(policy.timeout));
        }
        let wait = policy.interval.min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssistantError::Cancelled),
            _ = sleep(wait) => {}
        }
    }
}
