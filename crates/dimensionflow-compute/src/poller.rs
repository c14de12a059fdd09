//! Readiness polling with Fibonacci backoff
//!
//! Probes a resource until it reaches a target state, the timeout elapses, a
//! probe fails or a deletion settles in a failed state. Only an external
//! cancellation surfaces as `Err`; the other endings are ordinary [`Readiness`]
//! outcomes the caller must handle.

use crate::error::{ComputeError, Result};
use dimensionflow_cloud::{
    CloudClient, CloudError, ConditionAccumulator, InstanceStatus, ResourceType,
};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Interval schedule between probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    initial: Duration,
    max: Duration,
}

impl PollSchedule {
    /// Each interval grows by the previous increment until `max`: 1, 1, 2, 3, 5, 8, 8, ...
    pub fn fibonacci(initial: Duration, max: Duration) -> Self {
        Self {
            initial: initial.min(max),
            max,
        }
    }

    /// Constant delay between probes
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
        }
    }

    pub fn intervals(&self) -> Backoff {
        Backoff {
            interval: self.initial,
            increment: Duration::ZERO,
            max: self.max,
        }
    }
}

/// Endless iterator over a [`PollSchedule`]
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    increment: Duration,
    max: Duration,
}

impl Backoff {
    pub fn next_interval(&mut self) -> Duration {
        let current = self.interval;
        let previous = self.increment;
        self.increment = self.interval;
        self.interval = (self.interval + previous).min(self.max);
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_interval())
    }
}

/// Target predicate of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyWhen {
    /// Provider state string equals the given value
    State(&'static str),
    /// Translated status equals the given value
    Status(InstanceStatus),
    /// The resource no longer exists
    Gone,
}

impl ReadyWhen {
    fn is_met(&self, state: &str, started: bool) -> bool {
        match self {
            ReadyWhen::State(target) => state == *target,
            ReadyWhen::Status(target) => InstanceStatus::translate(state, started) == *target,
            ReadyWhen::Gone => false,
        }
    }

    /// A deletion that reports a failed state will not finish on its own
    fn is_stuck(&self, state: &str, started: bool) -> bool {
        *self == ReadyWhen::Gone && InstanceStatus::translate(state, started) == InstanceStatus::Failed
    }
}

/// Outcome of a completed wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut { timeout: Duration },
    /// A probe failed; waits are never retried past a client error
    Failed(CloudError),
    /// The resource settled in a failed provider state
    Stuck { state: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// Human-readable reason for a wait that did not succeed
    pub fn failure_message(&self, resource: &str) -> Option<String> {
        match self {
            Readiness::Ready => None,
            Readiness::TimedOut { timeout } => Some(format!(
                "Exceeded timeout of '{}' seconds while polling for pending operations to complete.",
                timeout.as_secs()
            )),
            Readiness::Failed(e) => Some(format!("Error while polling {}: {}", resource, e)),
            Readiness::Stuck { state } => {
                Some(format!("{} is in failed state '{}'.", resource, state))
            }
        }
    }

    /// Record a failed wait as an error condition; no-op when ready
    pub fn record(&self, accumulator: &mut ConditionAccumulator, key: Option<&str>, resource: &str) {
        if let Some(message) = self.failure_message(resource) {
            accumulator.add_error(key, message);
        }
    }
}

/// Waits for a single resource to reach a target state
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    schedule: PollSchedule,
    timeout: Duration,
}

impl ReadinessPoller {
    pub fn new(schedule: PollSchedule, timeout: Duration) -> Self {
        Self { schedule, timeout }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sleep, probe, evaluate; repeat until the target holds or the timeout elapses.
    ///
    /// Each sleep is clamped to the remaining budget, so the final probe happens
    /// no later than the timeout itself.
    pub async fn await_ready<C: CloudClient + ?Sized>(
        &self,
        client: &C,
        resource_type: ResourceType,
        resource_id: &str,
        target: ReadyWhen,
        cancel: &CancellationToken,
    ) -> Result<Readiness> {
        let started_at = Instant::now();
        let mut intervals = self.schedule.intervals();

        loop {
            let elapsed = started_at.elapsed();
            if elapsed >= self.timeout {
                tracing::warn!(
                    "Timed out after {:?} waiting for {} '{}'",
                    self.timeout,
                    resource_type,
                    resource_id
                );
                return Ok(Readiness::TimedOut {
                    timeout: self.timeout,
                });
            }

            let pause = intervals.next_interval().min(self.timeout - elapsed);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Cancelled while waiting for {} '{}'", resource_type, resource_id);
                    return Err(ComputeError::Cancelled {
                        resource: format!("{} '{}'", resource_type, resource_id),
                        issued: Vec::new(),
                    });
                }
                _ = sleep(pause) => {}
            }

            match probe(client, resource_type, resource_id).await {
                Ok((state, started)) => {
                    tracing::debug!(
                        "{} '{}' state: {} (started: {})",
                        resource_type,
                        resource_id,
                        state,
                        started
                    );
                    if target.is_met(&state, started) {
                        return Ok(Readiness::Ready);
                    }
                    if target.is_stuck(&state, started) {
                        tracing::warn!(
                            "{} '{}' reports failed state {}",
                            resource_type,
                            resource_id,
                            state
                        );
                        return Ok(Readiness::Stuck { state });
                    }
                }
                Err(e) if e.is_not_found() && target == ReadyWhen::Gone => {
                    tracing::debug!("{} '{}' is gone", resource_type, resource_id);
                    return Ok(Readiness::Ready);
                }
                Err(e) => {
                    tracing::warn!(
                        kind = e.kind(),
                        "Polling {} '{}' failed: {}",
                        resource_type,
                        resource_id,
                        e
                    );
                    return Ok(Readiness::Failed(e));
                }
            }
        }
    }
}

/// Current provider state and started flag; only servers report the latter
async fn probe<C: CloudClient + ?Sized>(
    client: &C,
    resource_type: ResourceType,
    resource_id: &str,
) -> dimensionflow_cloud::Result<(String, bool)> {
    match resource_type {
        ResourceType::Server => {
            let server = client.get_server(resource_id).await?;
            Ok((server.state, server.started))
        }
        _ => {
            let state = client.get_resource_state(resource_type, resource_id).await?;
            Ok((state, false))
        }
    }
}
