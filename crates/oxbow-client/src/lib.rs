//! Oxbow Client - Stream Lifecycle and Cursor Consumption
//!
//! A client for a managed, partitioned, append-only log service. The service
//! itself is a black box reached through the [`StreamService`] contract; this
//! crate implements the protocol a well-behaved client runs against it:
//!
//! - [`AdminController`]: discover-or-create streams by name and wait, with a
//!   bounded poll, for asynchronous lifecycle transitions.
//! - [`Publisher`]: submit message batches and report per-entry outcomes —
//!   batches are not atomic, and partial failure is data, not an error.
//! - [`CursorManager`]: obtain group-scoped cursors (durable committed
//!   offsets) or standalone cursors (caller-owned position).
//! - [`ConsumeLoop`]: fetch bounded batches, advance through the cursor chain,
//!   pace against service throttling, and stop on cancellation, a batch
//!   budget, or idleness.
//!
//! ## Example
//!
//! ```ignore
//! use oxbow_client::{
//!     AdminController, ClientConfig, ConsumeLoop, ConsumeOptions, CursorManager, Publisher,
//! };
//! use oxbow_core::{LifecycleState, MessageEntry, StartFrom};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ClientConfig::new(compartment_id);
//! let cancel = CancellationToken::new();
//!
//! let admin = AdminController::new(service.clone(), config.clone());
//! let stream = admin.get_or_create("orders", 1, &cancel).await?;
//!
//! let publisher = Publisher::new(service.clone(), config.clone());
//! let result = publisher
//!     .publish(&stream.id, &[MessageEntry::keyed("k0", "v0")])
//!     .await?;
//! for (i, code, message) in result.failures() {
//!     eprintln!("entry {i} failed: {code}: {message}");
//! }
//!
//! let cursor = CursorManager::new(service.clone(), config.clone())
//!     .group_cursor(&stream.id, "group", "instance-1", StartFrom::TrimHorizon, true)
//!     .await?;
//! let mut consume = ConsumeLoop::new(
//!     service.clone(), config.clone(), &stream.id, cursor, ConsumeOptions::default(),
//! );
//! consume.run(&cancel, |record| println!("{record:?}")).await?;
//!
//! admin.delete(&stream.id).await?;
//! admin.await_state(&stream.id, LifecycleState::Deleted, &cancel).await?;
//! ```

pub mod admin;
pub mod api;
pub mod config;
pub mod consume;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod retry;

pub use admin::AdminController;
pub use api::StreamService;
pub use config::ClientConfig;
pub use consume::{ConsumeLoop, ConsumeOptions, ConsumeSummary, StopReason};
pub use cursor::CursorManager;
pub use error::{Result, StreamError};
pub use memory::InMemoryStreamService;
pub use publisher::Publisher;
pub use retry::{retry_with_backoff, retry_with_jittered_backoff, RetryPolicy};

// Re-export the data model for one-import ergonomics.
pub use oxbow_core::{
    Cursor, CursorKind, LifecycleState, MessageEntry, PublishOutcome, PublishResult, Record,
    RecordBatch, StartFrom, StreamDescriptor,
};
