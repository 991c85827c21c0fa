//! Bounded status polling.

use std::fmt::Debug;
use std::time::Duration;

use pcaflow_core::error::{PcaError, PcaResult};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of a completed poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, S> {
    /// The entity does not exist (any more).
    Absent,
    /// The status reached one of the target statuses.
    Reached { entity: T, status: S },
    /// The status left the pending set without reaching a target. Whether
    /// that is acceptable is up to the caller.
    Diverged { entity: T, status: S },
}

/// Polls a fetch function on a fixed interval until its status leaves the
/// pending set or the timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct ActivationPoller {
    interval: Duration,
    timeout: Duration,
}

impl ActivationPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Fetches immediately, then once per interval.
    ///
    /// A [`PcaError::NotFound`] from `fetch` ends the poll with
    /// [`PollOutcome::Absent`]; any other error is returned as is. Running
    /// out of time yields [`PcaError::Timeout`] carrying `id` and the time
    /// spent waiting. The remote operation itself is not cancelled.
    pub async fn poll<T, S, F, Fut>(
        &self,
        id: &str,
        waiting_for: &str,
        pending: &[S],
        target: &[S],
        mut fetch: F,
    ) -> PcaResult<PollOutcome<T, S>>
    where
        S: PartialEq + Copy + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = PcaResult<(T, S)>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match fetch().await {
                Ok((entity, status)) if target.contains(&status) => {
                    debug!(id, ?status, attempts, "poll reached target status");
                    return Ok(PollOutcome::Reached { entity, status });
                }
                Ok((entity, status)) if !pending.contains(&status) => {
                    warn!(id, ?status, attempts, "poll left pending statuses without reaching a target");
                    return Ok(PollOutcome::Diverged { entity, status });
                }
                Ok((_, status)) => {
                    debug!(id, ?status, attempts, "still pending");
                }
                Err(PcaError::NotFound { .. }) => {
                    warn!(id, attempts, "entity not found while polling");
                    return Ok(PollOutcome::Absent);
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(PcaError::Timeout {
                    id: id.to_string(),
                    waiting_for: waiting_for.to_string(),
                    elapsed,
                });
            }
            tokio::time::sleep(self.interval.min(self.timeout - elapsed)).await;
        }
    }
}
