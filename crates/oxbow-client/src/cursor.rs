//! Cursor acquisition.
//!
//! Two read-position flavors exist. A *group* cursor joins a consumer group
//! whose committed offsets the service stores durably: with `commit_on_get`
//! every fetch through the cursor chain advances the group's position, so a
//! client that loses its token (crash, restart) re-requests a group cursor and
//! resumes from the last committed offset, not from the start. A *standalone*
//! cursor reads one partition from an explicit position with no server-side
//! tracking at all.

use crate::api::StreamService;
use crate::config::ClientConfig;
use crate::error::{Result, StreamError};
use crate::retry::retry_with_backoff;
use oxbow_core::{Cursor, StartFrom};
use std::sync::Arc;
use tracing::debug;

/// Requests cursors from the service.
pub struct CursorManager {
    service: Arc<dyn StreamService>,
    config: ClientConfig,
}

impl CursorManager {
    pub fn new(service: Arc<dyn StreamService>, config: ClientConfig) -> Self {
        Self { service, config }
    }

    /// Create a consumer-group cursor.
    ///
    /// `start` only applies when the group has no committed offset yet; an
    /// established group resumes from its stored position regardless.
    pub async fn group_cursor(
        &self,
        stream_id: &str,
        group: &str,
        instance: &str,
        start: StartFrom,
        commit_on_get: bool,
    ) -> Result<Cursor> {
        if group.is_empty() || instance.is_empty() {
            return Err(StreamError::InvalidArgument(
                "group and instance names must be non-empty".into(),
            ));
        }

        debug!(stream_id, group, instance, commit_on_get, "creating group cursor");
        retry_with_backoff(&self.config.retry, || {
            self.service
                .create_group_cursor(stream_id, group, instance, start, commit_on_get)
        })
        .await
    }

    /// Create a standalone cursor on one partition.
    ///
    /// Nothing is tracked server-side; the caller alone remembers where it
    /// left off (via the cursor chain it holds).
    pub async fn standalone_cursor(
        &self,
        stream_id: &str,
        partition: u32,
        start: StartFrom,
    ) -> Result<Cursor> {
        debug!(stream_id, partition, ?start, "creating standalone cursor");
        retry_with_backoff(&self.config.retry, || {
            self.service.create_cursor(stream_id, partition, start)
        })
        .await
    }
}
