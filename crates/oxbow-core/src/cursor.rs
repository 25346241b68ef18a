//! Opaque read-position cursors.
//!
//! A cursor is a single-use token: the fetch that presents it receives a
//! successor token representing the next read position, and the old token must
//! never be presented again. What a stale token does is the service's business
//! (undefined here); the client side simply makes reuse hard by making
//! `Cursor` non-`Clone` and having fetches hand back the successor.
//!
//! Two kinds exist. A *group* cursor is scoped to a consumer group whose
//! progress the service tracks durably — losing the local token and
//! re-requesting a group cursor resumes from the last committed offset. A
//! *standalone* cursor has no server-side tracking; the caller owns its
//! position entirely.

use serde::{Deserialize, Serialize};

/// Where a newly created cursor starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartFrom {
    /// Oldest retained record.
    TrimHorizon,
    /// Only records published after cursor creation.
    Latest,
    /// An explicit offset within the partition.
    AtOffset(u64),
    /// First record at or after a timestamp (milliseconds since epoch).
    AtTime(u64),
}

/// Semantic kind of a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorKind {
    /// Scoped to a consumer group; committed offsets are stored server-side.
    Group {
        group: String,
        instance: String,
    },
    /// No durable offset tracking.
    Standalone,
}

/// An opaque, single-use read position.
///
/// Deliberately not `Clone`: each token is consumed by exactly one fetch and
/// superseded by the token that fetch returns.
#[derive(Debug, PartialEq, Eq)]
pub struct Cursor {
    token: String,
    kind: CursorKind,
}

impl Cursor {
    pub fn new(token: impl Into<String>, kind: CursorKind) -> Self {
        Self {
            token: token.into(),
            kind,
        }
    }

    /// The opaque token to present to the service.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> &CursorKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, CursorKind::Group { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_cursor_kind() {
        let cursor = Cursor::new(
            "tok-1",
            CursorKind::Group {
                group: "analytics".into(),
                instance: "worker-1".into(),
            },
        );
        assert!(cursor.is_group());
        assert_eq!(cursor.token(), "tok-1");
    }

    #[test]
    fn standalone_cursor_kind() {
        let cursor = Cursor::new("tok-2", CursorKind::Standalone);
        assert!(!cursor.is_group());
    }
}
