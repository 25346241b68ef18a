//! Message entries and per-entry publish outcomes.
//!
//! A publish batch is **not atomic**: the service may commit some entries and
//! reject their siblings in the same request. The result therefore mirrors the
//! input one-to-one — outcome `i` corresponds to entry `i` — and failures are
//! per-entry data, never a single error for the whole batch. Callers that drop
//! the per-entry detail lose their only mechanism for diagnosing partial
//! failures.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single keyed message to be appended to a stream.
///
/// Immutable once constructed. The key, when present, determines partition
/// routing server-side; key-less entries are distributed at the service's
/// discretion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    /// Optional partitioning key.
    pub key: Option<Bytes>,

    /// Payload.
    pub value: Bytes,
}

impl MessageEntry {
    /// Entry with a partitioning key.
    pub fn keyed(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    /// Key-less entry.
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    /// Estimated wire size in bytes, used against the service's entry limit.
    pub fn estimated_size(&self) -> usize {
        self.key.as_ref().map(|k| k.len()).unwrap_or(0) + self.value.len()
    }
}

/// Outcome of appending one entry of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishOutcome {
    /// The entry was durably appended.
    Committed {
        /// Partition the entry landed on.
        partition: u32,
        /// Offset within that partition.
        offset: u64,
    },
    /// The entry was rejected; the rest of the batch is unaffected.
    Failed {
        /// Service error code, e.g. `InternalServerError`.
        code: String,
        /// Human-readable detail.
        message: String,
    },
}

impl PublishOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, PublishOutcome::Committed { .. })
    }
}

/// Ordered per-entry outcomes of a publish call.
///
/// Invariant (held by the service contract and asserted by the client):
/// `entries.len()` equals the submitted batch length, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub entries: Vec<PublishOutcome>,
}

impl PublishResult {
    pub fn new(entries: Vec<PublishOutcome>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the service rejected.
    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_committed()).count()
    }

    /// True when every entry was committed.
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }

    /// Iterate over `(batch_index, code, message)` for rejected entries.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| match e {
            PublishOutcome::Failed { code, message } => {
                Some((i, code.as_str(), message.as_str()))
            }
            PublishOutcome::Committed { .. } => None,
        })
    }
}
