//! Stream lifecycle administration.
//!
//! Provisioning and teardown are asynchronous server-side: `create_stream`
//! returns a descriptor that is typically still `Creating`, and
//! `delete_stream` merely starts the `Deleting -> Deleted` transition. The
//! controller therefore pairs each request with [`AdminController::await_state`],
//! a polling wait that is always bounded by `ClientConfig::state_timeout` and
//! always interruptible through a cancellation token.
//!
//! ## Example
//!
//! ```ignore
//! use oxbow_client::{AdminController, ClientConfig};
//! use oxbow_core::LifecycleState;
//! use tokio_util::sync::CancellationToken;
//!
//! let admin = AdminController::new(service, ClientConfig::new(compartment));
//! let cancel = CancellationToken::new();
//!
//! let stream = admin.get_or_create("orders", 4, &cancel).await?;
//! // ... publish and consume ...
//! admin.delete(&stream.id).await?;
//! admin.await_state(&stream.id, LifecycleState::Deleted, &cancel).await?;
//! ```

use crate::api::StreamService;
use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::retry::retry_with_backoff;
use oxbow_core::{LifecycleState, StreamDescriptor};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Creates, discovers, and tears down streams.
pub struct AdminController {
    service: Arc<dyn StreamService>,
    config: ClientConfig,
}

impl AdminController {
    pub fn new(service: Arc<dyn StreamService>, config: ClientConfig) -> Self {
        Self { service, config }
    }

    /// Find an `Active` stream by name, or `None`.
    ///
    /// Names are unique by convention only; when the service returns several
    /// matches the first one wins.
    pub async fn find_active_by_name(&self, name: &str) -> Result<Option<StreamDescriptor>> {
        let streams = retry_with_backoff(&self.config.retry, || {
            self.service.list_streams(
                &self.config.compartment_id,
                Some(name),
                Some(LifecycleState::Active),
            )
        })
        .await?;

        Ok(streams.into_iter().next())
    }

    /// Request creation of a stream. The returned descriptor is usually still
    /// `Creating`; follow up with [`Self::await_state`].
    pub async fn create(&self, name: &str, partitions: u32) -> Result<StreamDescriptor> {
        if partitions == 0 {
            return Err(StreamError::InvalidArgument(
                "a stream needs at least one partition".into(),
            ));
        }

        info!(name, partitions, "creating stream");
        retry_with_backoff(&self.config.retry, || {
            self.service
                .create_stream(&self.config.compartment_id, name, partitions)
        })
        .await
    }

    /// Fetch the current descriptor for a stream.
    pub async fn get(&self, stream_id: &str) -> Result<StreamDescriptor> {
        retry_with_backoff(&self.config.retry, || self.service.get_stream(stream_id)).await
    }

    /// Poll until the stream reaches `target`, within the configured budget.
    ///
    /// Returns immediately, without sleeping, if the stream is already in the
    /// target state. Fails with:
    /// - `TimeoutExceeded` once `ClientConfig::state_timeout` has elapsed;
    /// - `Cancelled` when the token fires;
    /// - `NotFound` if the stream vanishes while a non-terminal state is
    ///   awaited (a vanished stream counts as success when waiting for
    ///   `Deleted` — the service stops reporting fully removed streams);
    /// - `Conflict` if the stream lands in a terminal state other than the
    ///   target, e.g. `Failed` while `Active` is awaited.
    pub async fn await_state(
        &self,
        stream_id: &str,
        target: LifecycleState,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor> {
        let budget = self.config.state_timeout;
        let deadline = Instant::now() + budget;
        let mut last_seen: Option<StreamDescriptor> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }

            match self.get(stream_id).await {
                Ok(descriptor) => {
                    if descriptor.lifecycle_state == target {
                        debug!(stream_id, state = %target, "target state reached");
                        return Ok(descriptor);
                    }
                    if descriptor.lifecycle_state.is_terminal() {
                        return Err(StreamError::Conflict(format!(
                            "stream {stream_id} reached terminal state {} while waiting for {target}",
                            descriptor.lifecycle_state
                        )));
                    }
                    debug!(
                        stream_id,
                        state = %descriptor.lifecycle_state,
                        waiting_for = %target,
                        "stream not yet in target state"
                    );
                    last_seen = Some(descriptor);
                }
                Err(StreamError::NotFound(_)) if target == LifecycleState::Deleted => {
                    // Fully removed streams drop out of the service entirely.
                    let mut descriptor = last_seen.unwrap_or(StreamDescriptor {
                        id: stream_id.to_string(),
                        name: String::new(),
                        partitions: 0,
                        lifecycle_state: LifecycleState::Deleted,
                    });
                    descriptor.lifecycle_state = LifecycleState::Deleted;
                    return Ok(descriptor);
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StreamError::TimeoutExceeded(budget));
            }
            let nap = self.config.poll_interval.min(deadline - now);

            tokio::select! {
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                _ = sleep(nap) => {}
            }
        }
    }

    /// Reuse an existing `Active` stream by name, or create one and wait for
    /// it to activate.
    pub async fn get_or_create(
        &self,
        name: &str,
        partitions: u32,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor> {
        if let Some(existing) = self.find_active_by_name(name).await? {
            // The lookup filtered on Active, so the hit is already usable.
            debug_assert!(existing.is_active());
            info!(name, stream_id = %existing.id, "reusing active stream");
            return Ok(existing);
        }

        info!(name, "no active stream found, provisioning");
        let created = self.create(name, partitions).await?;
        let active = self
            .await_state(&created.id, LifecycleState::Active, cancel)
            .await?;

        if !self.config.propagation_delay.is_zero() {
            // Settle window for backends with visible eventual-consistency lag.
            sleep(self.config.propagation_delay).await;
        }

        Ok(active)
    }

    /// Request deletion of a stream. Best-effort cleanup: callers tearing down
    /// may treat `NotFound` as already done.
    pub async fn delete(&self, stream_id: &str) -> Result<()> {
        info!(stream_id, "deleting stream");
        retry_with_backoff(&self.config.retry, || self.service.delete_stream(stream_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStreamService;
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    fn fast_config() -> ClientConfig {
        ClientConfig::new("test-compartment")
            .retry(RetryPolicy::none())
            .poll_interval(Duration::from_millis(5))
            .state_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn create_rejects_zero_partitions() {
        let service = Arc::new(InMemoryStreamService::new());
        let admin = AdminController::new(service, fast_config());

        let err = admin.create("orders", 0).await.unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn await_state_returns_immediately_when_already_in_target() {
        let service = Arc::new(InMemoryStreamService::new());
        let admin = AdminController::new(service, fast_config());
        let cancel = CancellationToken::new();

        let created = admin.create("orders", 1).await.unwrap();
        let active = admin
            .await_state(&created.id, LifecycleState::Active, &cancel)
            .await
            .unwrap();

        let again = admin
            .await_state(&active.id, LifecycleState::Active, &cancel)
            .await
            .unwrap();
        assert_eq!(again.lifecycle_state, LifecycleState::Active);
        assert_eq!(again.id, active.id);
    }

    #[tokio::test]
    async fn await_state_times_out_when_state_never_arrives() {
        let service = Arc::new(InMemoryStreamService::frozen());
        let admin = AdminController::new(service, fast_config());
        let cancel = CancellationToken::new();

        let created = admin.create("stuck", 1).await.unwrap();
        let err = admin
            .await_state(&created.id, LifecycleState::Active, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::TimeoutExceeded(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn await_state_conflicts_when_stream_reaches_wrong_terminal_state() {
        let service = Arc::new(InMemoryStreamService::new());
        service.fail_creation();
        let admin = AdminController::new(
            service,
            fast_config().state_timeout(Duration::from_secs(60)),
        );
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let created = admin.create("doomed", 1).await.unwrap();
        let err = admin
            .await_state(&created.id, LifecycleState::Active, &cancel)
            .await
            .unwrap_err();

        // A failed stream is reported as a conflict as soon as it is seen,
        // not after the waiting budget runs out.
        assert!(matches!(err, StreamError::Conflict(_)));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn await_state_observes_cancellation() {
        let service = Arc::new(InMemoryStreamService::frozen());
        let admin = AdminController::new(
            service,
            fast_config().state_timeout(Duration::from_secs(60)),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let created = admin.create("stuck", 1).await.unwrap();
        let err = admin
            .await_state(&created.id, LifecycleState::Active, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));
    }

    #[tokio::test]
    async fn await_deleted_succeeds_when_stream_vanishes() {
        let service = Arc::new(InMemoryStreamService::new());
        let admin = AdminController::new(service.clone(), fast_config());
        let cancel = CancellationToken::new();

        let stream = admin.get_or_create("ephemeral", 1, &cancel).await.unwrap();
        admin.delete(&stream.id).await.unwrap();
        let gone = admin
            .await_state(&stream.id, LifecycleState::Deleted, &cancel)
            .await
            .unwrap();
        assert_eq!(gone.lifecycle_state, LifecycleState::Deleted);
    }

    #[tokio::test]
    async fn await_state_not_found_for_unknown_stream() {
        let service = Arc::new(InMemoryStreamService::new());
        let admin = AdminController::new(service, fast_config());
        let cancel = CancellationToken::new();

        let err = admin
            .await_state("st-missing", LifecycleState::Active, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::NotFound(_)));
    }
}
