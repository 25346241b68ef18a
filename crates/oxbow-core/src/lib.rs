//! Oxbow Core - Data Model
//!
//! This crate defines the data types exchanged between the Oxbow client and a
//! managed append-only stream service: stream descriptors with their lifecycle
//! states, message entries, per-entry publish outcomes, opaque cursors, and
//! consumed record batches.
//!
//! The types here carry no behavior beyond construction and inspection. All
//! state transitions (provisioning, partition routing, offset assignment,
//! group coordination) happen server-side; the client only observes snapshots.
//!
//! ## Design Decisions
//! - Keys and values use `bytes::Bytes` for zero-copy handling.
//! - `Cursor` is intentionally not `Clone`: a cursor token is consumed by the
//!   fetch that uses it and replaced by the successor token the service hands
//!   back. The ownership model makes accidental token reuse a compile error.
//! - Publish outcomes are a tagged variant per entry, never a single error for
//!   the whole batch; batches are not atomic.

pub mod cursor;
pub mod message;
pub mod record;
pub mod stream;

pub use cursor::{Cursor, CursorKind, StartFrom};
pub use message::{MessageEntry, PublishOutcome, PublishResult};
pub use record::{Record, RecordBatch};
pub use stream::{LifecycleState, StreamDescriptor};
