//! Error types for Oxbow client operations.
//!
//! ## Error Handling Strategy
//!
//! - **Transient, retry-eligible**: `RateLimited`, `ServiceUnavailable` —
//!   retried locally with bounded exponential backoff (see [`crate::retry`]).
//! - **Surfaced immediately**: `NotFound`, `Conflict`, `InvalidArgument`.
//! - **Budget exhaustion**: `TimeoutExceeded` from polling loops,
//!   `Cancelled` from an external stop signal.
//! - **Never an error**: partial publish failure. A batch that commits some
//!   entries and rejects others returns per-entry outcomes in
//!   [`oxbow_core::PublishResult`]; collapsing that into one error would
//!   discard the only diagnostic for the failed entries.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the client.
pub type Result<T> = std::result::Result<T, StreamError>;

/// All failures a client operation can surface.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Stream or cursor has vanished (or never existed).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state, e.g. duplicate stream name on
    /// create.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The service is throttling this client. Transient.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service cannot currently serve the request. Transient.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A polling budget ran out before the watched state arrived.
    #[error("timed out after {0:?}")]
    TimeoutExceeded(Duration),

    /// Malformed request rejected locally or by the service, e.g. an empty
    /// publish batch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An external cancellation signal stopped the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Transport-level failure between client and service.
    #[error("transport error: {0}")]
    Transport(String),
}

impl StreamError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StreamError::RateLimited(_) | StreamError::ServiceUnavailable(_)
        )
    }
}
