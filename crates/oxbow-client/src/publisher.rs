//! Batch publishing with per-entry outcome reporting.
//!
//! A publish call is a single round trip and the batch is not atomic: index
//! `i` of the returned [`PublishResult`] is the fate of entry `i`, and some
//! entries can commit while siblings fail. The publisher surfaces that
//! structure untouched — a partial failure is data for the caller to inspect,
//! never an error return.

use crate::api::StreamService;
use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::retry::retry_with_jittered_backoff;
use oxbow_core::{MessageEntry, PublishResult};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Appends message batches to a stream.
pub struct Publisher {
    service: Arc<dyn StreamService>,
    config: ClientConfig,
}

impl Publisher {
    pub fn new(service: Arc<dyn StreamService>, config: ClientConfig) -> Self {
        Self { service, config }
    }

    /// Publish a batch of entries in order.
    ///
    /// The whole request is retried on transient service errors. An empty
    /// batch is rejected locally with `InvalidArgument`; per-entry size limits
    /// belong to the service and come back as per-entry failures.
    ///
    /// The returned result has exactly `entries.len()` outcomes in submission
    /// order. Callers must check [`PublishResult::failure_count`] (or iterate
    /// [`PublishResult::failures`]) — the per-entry error code and message are
    /// the only diagnostics for entries the service rejected.
    pub async fn publish(
        &self,
        stream_id: &str,
        entries: &[MessageEntry],
    ) -> Result<PublishResult> {
        if entries.is_empty() {
            return Err(StreamError::InvalidArgument(
                "publish batch must contain at least one entry".into(),
            ));
        }

        debug!(stream_id, batch = entries.len(), "publishing batch");
        let result = retry_with_jittered_backoff(&self.config.retry, || {
            self.service.put_messages(stream_id, entries)
        })
        .await?;

        // Contract with the service: one outcome per submitted entry.
        debug_assert_eq!(result.len(), entries.len());

        if result.is_clean() {
            debug!(stream_id, committed = result.len(), "batch fully committed");
        } else {
            warn!(
                stream_id,
                committed = result.len() - result.failure_count(),
                failed = result.failure_count(),
                "batch partially failed"
            );
        }

        if !self.config.propagation_delay.is_zero() {
            // Settle window before readers go looking for these records.
            sleep(self.config.propagation_delay).await;
        }

        Ok(result)
    }
}
