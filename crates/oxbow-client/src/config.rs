//! Client configuration.
//!
//! All tunables live in an explicit [`ClientConfig`] passed to the components
//! that need service access — no process-wide singleton, no implicit global
//! credential state. The reference behavior this client reconstructs hid two
//! flat one-second sleeps (post-activation, post-publish) inside the code;
//! those are eventual-consistency workarounds, not protocol requirements, so
//! here they are a configurable `propagation_delay` defaulting to zero.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Configuration shared by the admin, publisher, cursor, and consume
/// components.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Compartment (tenancy scope) streams are provisioned in.
    pub compartment_id: String,

    /// Retry policy for transient service failures.
    pub retry: RetryPolicy,

    /// Interval between lifecycle-state polls in `await_state`.
    pub poll_interval: Duration,

    /// Total budget for one `await_state` call. Every polling loop carries a
    /// finite budget; there is no unbounded wait.
    pub state_timeout: Duration,

    /// Minimum delay between consecutive fetches in the consume loop.
    /// Client-side backpressure against the service's fetch throttling.
    pub pacing: Duration,

    /// Settle delay after activation and after publishing, for backends with
    /// visible eventual-consistency lag. Zero disables it.
    pub propagation_delay: Duration,
}

impl ClientConfig {
    /// Defaults: 1s poll interval, 120s state budget, 1s fetch pacing, no
    /// propagation delay.
    pub fn new(compartment_id: impl Into<String>) -> Self {
        Self {
            compartment_id: compartment_id.into(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(1),
            state_timeout: Duration::from_secs(120),
            pacing: Duration::from_secs(1),
            propagation_delay: Duration::ZERO,
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state_timeout(mut self, timeout: Duration) -> Self {
        self.state_timeout = timeout;
        self
    }

    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }
}
