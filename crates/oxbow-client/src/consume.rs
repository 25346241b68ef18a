//! Paced, cursor-driven consumption.
//!
//! The loop holds exactly one live cursor at a time and alternates between two
//! states: positioned (holding a cursor) and fetching. Each successful fetch
//! *must* replace the held cursor with the batch's successor before the next
//! fetch — presenting the old token again re-reads the same records. On a
//! failed fetch the held cursor is kept, so a retry resumes from the same
//! position without duplicates or gaps.
//!
//! Fetching is throttled by the service, so the loop enforces a minimum
//! inter-fetch delay (`ClientConfig::pacing`). That is client-side
//! backpressure policy, not a protocol rule, and is fully configurable.
//!
//! There is no fixed iteration count baked in. The loop stops on an external
//! cancellation token, an optional batch budget, or an optional run of
//! consecutive empty batches, and reports which one fired in its summary. It
//! stays positioned on its current cursor afterwards, so a stopped loop can be
//! re-run and resumes where it left off.

use crate::api::StreamService;
use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::retry::retry_with_backoff;
use oxbow_core::{Cursor, Record};
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Stop conditions and fetch sizing for a consume run.
#[derive(Debug, Clone)]
pub struct ConsumeOptions {
    /// Upper bound on records per fetch.
    pub fetch_limit: usize,

    /// Stop after this many fetches. `None` runs until cancelled.
    pub max_batches: Option<usize>,

    /// Stop after this many consecutive empty fetches ("empty-forever"
    /// detection). `None` keeps polling an idle stream.
    pub idle_limit: Option<usize>,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            fetch_limit: 100,
            max_batches: None,
            idle_limit: None,
        }
    }
}

/// Which stop condition ended a [`ConsumeLoop::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired.
    Cancelled,
    /// The configured batch budget was spent.
    BatchLimit,
    /// The configured number of consecutive empty fetches was reached.
    Idle,
}

/// What a consume run did before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub batches: usize,
    pub records: u64,
    pub reason: StopReason,
}

/// Drains records from a stream by iterating a cursor chain.
pub struct ConsumeLoop {
    service: Arc<dyn StreamService>,
    config: ClientConfig,
    stream_id: String,
    cursor: Option<Cursor>,
    options: ConsumeOptions,
}

impl ConsumeLoop {
    pub fn new(
        service: Arc<dyn StreamService>,
        config: ClientConfig,
        stream_id: impl Into<String>,
        cursor: Cursor,
        options: ConsumeOptions,
    ) -> Self {
        Self {
            service,
            config,
            stream_id: stream_id.into(),
            cursor: Some(cursor),
            options,
        }
    }

    /// The position the next fetch will read from.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Give up the held cursor, e.g. to hand consumption to another loop.
    pub fn into_cursor(self) -> Option<Cursor> {
        self.cursor
    }

    /// Perform one bounded fetch and advance to the successor cursor.
    ///
    /// Zero records is a normal outcome on a quiet stream. On error the held
    /// cursor is unchanged, so calling again retries the same position.
    pub async fn poll_once(&mut self) -> Result<Vec<Record>> {
        let cursor = self.cursor.take().ok_or_else(|| {
            StreamError::InvalidArgument("consume loop no longer holds a cursor".into())
        })?;

        let fetched = retry_with_backoff(&self.config.retry, || {
            self.service
                .get_messages(&self.stream_id, &cursor, self.options.fetch_limit)
        })
        .await;

        match fetched {
            Ok(batch) => {
                let (records, next_cursor) = batch.into_parts();
                trace!(
                    stream_id = %self.stream_id,
                    records = records.len(),
                    "fetched batch"
                );
                // The old token is superseded the moment the successor
                // arrives; holding anything but `next_cursor` from here on
                // would cause duplicate reads.
                self.cursor = Some(next_cursor);
                Ok(records)
            }
            Err(err) => {
                // Keep the last-known-good position for the retry.
                self.cursor = Some(cursor);
                Err(err)
            }
        }
    }

    /// Fetch, hand records to `handler`, pace, repeat until a stop condition.
    ///
    /// Cancellation is checked both between fetches and during the pacing
    /// sleep. Errors propagate after failing the current iteration; the loop
    /// keeps its cursor either way and can be re-run to resume.
    pub async fn run<F>(
        &mut self,
        cancel: &CancellationToken,
        mut handler: F,
    ) -> Result<ConsumeSummary>
    where
        F: FnMut(Record),
    {
        let mut batches = 0usize;
        let mut records_seen = 0u64;
        let mut idle_streak = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Ok(self.summarize(batches, records_seen, StopReason::Cancelled));
            }

            let fetch_started = Instant::now();
            let records = self.poll_once().await?;
            batches += 1;

            if records.is_empty() {
                idle_streak += 1;
            } else {
                idle_streak = 0;
                records_seen += records.len() as u64;
                for record in records {
                    handler(record);
                }
            }

            if let Some(limit) = self.options.max_batches {
                if batches >= limit {
                    return Ok(self.summarize(batches, records_seen, StopReason::BatchLimit));
                }
            }
            if let Some(limit) = self.options.idle_limit {
                if idle_streak >= limit {
                    return Ok(self.summarize(batches, records_seen, StopReason::Idle));
                }
            }

            // Minimum inter-fetch delay, measured from fetch start.
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(self.summarize(batches, records_seen, StopReason::Cancelled));
                }
                _ = sleep_until(fetch_started + self.config.pacing) => {}
            }
        }
    }

    fn summarize(&self, batches: usize, records: u64, reason: StopReason) -> ConsumeSummary {
        debug!(
            stream_id = %self.stream_id,
            batches,
            records,
            ?reason,
            "consume loop stopped"
        );
        ConsumeSummary {
            batches,
            records,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminController;
    use crate::cursor::CursorManager;
    use crate::memory::InMemoryStreamService;
    use crate::publisher::Publisher;
    use crate::retry::RetryPolicy;
    use oxbow_core::{MessageEntry, StartFrom};
    use std::time::Duration;

    fn config() -> ClientConfig {
        ClientConfig::new("test-compartment")
            .retry(RetryPolicy::none())
            .pacing(Duration::from_millis(1))
    }

    async fn seeded_stream(
        service: &Arc<InMemoryStreamService>,
        name: &str,
        entries: usize,
    ) -> String {
        let admin = AdminController::new(service.clone(), config());
        let stream = admin
            .get_or_create(name, 1, &tokio_util::sync::CancellationToken::new())
            .await
            .unwrap();
        if entries > 0 {
            let publisher = Publisher::new(service.clone(), config());
            let batch: Vec<_> = (0..entries)
                .map(|i| MessageEntry::keyed(format!("k{i}"), format!("v{i}")))
                .collect();
            let result = publisher.publish(&stream.id, &batch).await.unwrap();
            assert!(result.is_clean());
        }
        stream.id
    }

    async fn trim_horizon_cursor(
        service: &Arc<InMemoryStreamService>,
        stream_id: &str,
    ) -> oxbow_core::Cursor {
        CursorManager::new(service.clone(), config())
            .group_cursor(stream_id, "g", "i-1", StartFrom::TrimHorizon, true)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_stream_yields_empty_batch_and_next_cursor() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "quiet", 0).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service,
            config(),
            &stream_id,
            cursor,
            ConsumeOptions::default(),
        );
        let records = consume.poll_once().await.unwrap();
        assert!(records.is_empty());
        // Still positioned: the empty fetch handed back a successor cursor.
        assert!(consume.cursor().is_some());
    }

    #[tokio::test]
    async fn consecutive_polls_do_not_redeliver() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 5).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service,
            config(),
            &stream_id,
            cursor,
            ConsumeOptions {
                fetch_limit: 3,
                ..ConsumeOptions::default()
            },
        );

        let first = consume.poll_once().await.unwrap();
        let second = consume.poll_once().await.unwrap();
        let third = consume.poll_once().await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        assert!(third.is_empty());

        let offsets: Vec<u64> = first.iter().chain(&second).map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn fetch_failure_preserves_position() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 3).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service.clone(),
            config(),
            &stream_id,
            cursor,
            ConsumeOptions::default(),
        );

        service.inject_fault(StreamError::ServiceUnavailable("blip".into()));
        let err = consume.poll_once().await.unwrap_err();
        assert!(matches!(err, StreamError::ServiceUnavailable(_)));

        // Same position on retry: all three records, no gap.
        let records = consume.poll_once().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].offset, 0);
    }

    #[tokio::test]
    async fn run_stops_at_batch_limit() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 4).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service,
            config(),
            &stream_id,
            cursor,
            ConsumeOptions {
                fetch_limit: 2,
                max_batches: Some(3),
                idle_limit: None,
            },
        );

        let mut seen = Vec::new();
        let summary = consume
            .run(&CancellationToken::new(), |record| {
                seen.push(record.offset);
            })
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::BatchLimit);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.records, 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn run_stops_after_idle_streak() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 2).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service,
            config(),
            &stream_id,
            cursor,
            ConsumeOptions {
                fetch_limit: 10,
                max_batches: None,
                idle_limit: Some(2),
            },
        );

        let summary = consume.run(&CancellationToken::new(), |_| {}).await.unwrap();
        assert_eq!(summary.reason, StopReason::Idle);
        assert_eq!(summary.records, 2);
        // One productive fetch plus two empty ones.
        assert_eq!(summary.batches, 3);
    }

    #[tokio::test]
    async fn run_observes_cancellation_and_is_resumable() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 3).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let mut consume = ConsumeLoop::new(
            service,
            config(),
            &stream_id,
            cursor,
            ConsumeOptions {
                fetch_limit: 10,
                max_batches: None,
                idle_limit: None,
            },
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = consume.run(&cancel, |_| {}).await.unwrap();
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.batches, 0);

        // Restart with a fresh token from the same position; nothing was
        // consumed by the cancelled run, so all three records are still there.
        consume.options.max_batches = Some(1);
        let mut seen = Vec::new();
        let summary = consume
            .run(&CancellationToken::new(), |record| seen.push(record.offset))
            .await
            .unwrap();
        assert_eq!(summary.reason, StopReason::BatchLimit);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_spaces_out_fetches() {
        let service = Arc::new(InMemoryStreamService::new());
        let stream_id = seeded_stream(&service, "orders", 0).await;
        let cursor = trim_horizon_cursor(&service, &stream_id).await;

        let pacing = Duration::from_secs(1);
        let mut consume = ConsumeLoop::new(
            service,
            config().pacing(pacing),
            &stream_id,
            cursor,
            ConsumeOptions {
                fetch_limit: 10,
                max_batches: Some(4),
                idle_limit: None,
            },
        );

        let started = Instant::now();
        let summary = consume.run(&CancellationToken::new(), |_| {}).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(summary.batches, 4);
        // Three pacing gaps between four fetches on the paused clock.
        assert!(
            elapsed >= pacing * 3,
            "expected >= {:?} of pacing, got {:?}",
            pacing * 3,
            elapsed
        );
    }
}
