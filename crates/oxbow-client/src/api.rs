//! The request/response contract with the remote stream service.
//!
//! The service is a black box: partitioning, replication, offset storage, and
//! consumer-group coordination all live behind this trait. The client never
//! reimplements any of it — it only issues these calls and interprets the
//! responses. Implementations wrap whatever transport reaches the real
//! service; [`crate::memory::InMemoryStreamService`] is a complete in-process
//! implementation used by tests and examples.

use crate::error::Result;
use async_trait::async_trait;
use oxbow_core::{
    Cursor, LifecycleState, MessageEntry, PublishResult, RecordBatch, StartFrom, StreamDescriptor,
};

/// RPC surface of the managed stream service.
///
/// All methods are a single network round trip with no local side effects.
#[async_trait]
pub trait StreamService: Send + Sync {
    /// List streams in a compartment, optionally filtered by exact name and
    /// lifecycle state. Ordering beyond "as returned by the service" is not
    /// guaranteed.
    async fn list_streams(
        &self,
        compartment_id: &str,
        name: Option<&str>,
        lifecycle_state: Option<LifecycleState>,
    ) -> Result<Vec<StreamDescriptor>>;

    /// Request provisioning of a new stream. The returned descriptor is
    /// typically still `Creating`; callers poll [`Self::get_stream`] until it
    /// becomes `Active`.
    async fn create_stream(
        &self,
        compartment_id: &str,
        name: &str,
        partitions: u32,
    ) -> Result<StreamDescriptor>;

    /// Fetch the current descriptor snapshot for a stream.
    async fn get_stream(&self, stream_id: &str) -> Result<StreamDescriptor>;

    /// Request deletion. Asynchronous server-side; the stream passes through
    /// `Deleting` before reaching `Deleted`.
    async fn delete_stream(&self, stream_id: &str) -> Result<()>;

    /// Append a batch of entries. The batch is not atomic; the result carries
    /// one outcome per entry, in submission order.
    async fn put_messages(
        &self,
        stream_id: &str,
        entries: &[MessageEntry],
    ) -> Result<PublishResult>;

    /// Create a consumer-group-scoped cursor. With `commit_on_get`, every
    /// fetch through the cursor chain advances the group's durably stored
    /// offset.
    async fn create_group_cursor(
        &self,
        stream_id: &str,
        group: &str,
        instance: &str,
        start: StartFrom,
        commit_on_get: bool,
    ) -> Result<Cursor>;

    /// Create a standalone cursor on one partition. No server-side offset
    /// tracking; the caller owns its position.
    async fn create_cursor(
        &self,
        stream_id: &str,
        partition: u32,
        start: StartFrom,
    ) -> Result<Cursor>;

    /// Fetch up to `limit` records at the cursor's position. Always returns a
    /// successor cursor, even for an empty batch; the presented token must not
    /// be reused afterwards.
    async fn get_messages(
        &self,
        stream_id: &str,
        cursor: &Cursor,
        limit: usize,
    ) -> Result<RecordBatch>;
}
