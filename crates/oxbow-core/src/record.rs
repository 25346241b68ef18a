//! Consumed records and fetch batches.

use crate::cursor::Cursor;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single record read from a stream.
///
/// The `(partition, offset)` pair is the service's durable identity for the
/// record; offsets increase monotonically within a partition only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Partition this record belongs to.
    pub partition: u32,

    /// Offset within the partition.
    pub offset: u64,

    /// Append timestamp in milliseconds since epoch.
    pub timestamp: u64,

    /// Optional key the record was published with.
    pub key: Option<Bytes>,

    /// Payload.
    pub value: Bytes,
}

impl Record {
    /// Approximate wire size: partition + offset + timestamp plus key and
    /// value bytes.
    pub fn estimated_size(&self) -> usize {
        4 + 8 + 8 + self.key.as_ref().map(|k| k.len()).unwrap_or(0) + self.value.len()
    }
}

/// Result of one fetch: zero or more records plus the successor cursor.
///
/// The next cursor is present even when `records` is empty — the log simply
/// has no new data yet, which is not an error.
#[derive(Debug)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub next_cursor: Cursor,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into records and the successor cursor.
    pub fn into_parts(self) -> (Vec<Record>, Cursor) {
        (self.records, self.next_cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorKind;

    #[test]
    fn empty_batch_still_carries_cursor() {
        let batch = RecordBatch {
            records: vec![],
            next_cursor: Cursor::new("tok-next", CursorKind::Standalone),
        };
        assert!(batch.is_empty());
        let (records, next) = batch.into_parts();
        assert!(records.is_empty());
        assert_eq!(next.token(), "tok-next");
    }

    #[test]
    fn record_size_counts_key_and_value() {
        let record = Record {
            partition: 0,
            offset: 42,
            timestamp: 1_700_000_000_000,
            key: Some(Bytes::from_static(b"k0")),
            value: Bytes::from_static(b"payload"),
        };
        // 4 (partition) + 8 (offset) + 8 (timestamp) fixed bytes.
        assert_eq!(record.estimated_size(), 20 + 2 + 7);
    }
}
