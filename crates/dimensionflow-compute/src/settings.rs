//! Provider-wide tuning: poll timings, server defaults and batch concurrency

use crate::poller::PollSchedule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    /// Ceiling for network domain, VLAN and server readiness waits
    pub poll_timeout_secs: u64,

    pub initial_poll_interval_secs: u64,

    /// Cap of the Fibonacci backoff between readiness probes
    pub max_poll_interval_secs: u64,

    /// Ceiling for delete confirmation
    pub delete_timeout_secs: u64,

    /// Fixed delay between delete confirmation probes
    pub delete_poll_delay_secs: u64,

    pub cpu_count: u32,

    pub memory_gb: u32,

    /// Server creations in flight at once; 1 is strictly sequential
    pub server_concurrency: usize,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 180,
            initial_poll_interval_secs: 1,
            max_poll_interval_secs: 8,
            delete_timeout_secs: 300,
            delete_poll_delay_secs: 30,
            cpu_count: 4,
            memory_gb: 32,
            server_concurrency: 4,
        }
    }
}

impl ComputeSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    pub fn readiness_schedule(&self) -> PollSchedule {
        PollSchedule::fibonacci(
            Duration::from_secs(self.initial_poll_interval_secs),
            Duration::from_secs(self.max_poll_interval_secs),
        )
    }

    pub fn deletion_schedule(&self) -> PollSchedule {
        PollSchedule::fixed(Duration::from_secs(self.delete_poll_delay_secs))
    }

    pub fn with_server_concurrency(mut self, concurrency: usize) -> Self {
        self.server_concurrency = concurrency;
        self
    }
}
