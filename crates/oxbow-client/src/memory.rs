//! In-process implementation of [`StreamService`].
//!
//! A complete, deterministic stand-in for the remote service, used by unit and
//! integration tests and by the examples. It models the behaviors the client
//! protocol depends on:
//!
//! - asynchronous lifecycle transitions, advanced one step per
//!   `get_stream` poll (configurable latency, including a frozen mode that
//!   never transitions — for timeout tests);
//! - key-hash partition routing with per-partition offset assignment;
//! - single-use cursor tokens: a token is invalidated by the fetch that
//!   presents it and replaced by a successor;
//! - durable consumer-group offsets honoring `commit_on_get`;
//! - fault injection (a queue of errors served before real work) and
//!   per-entry publish rejection for partial-failure scenarios.

use crate::api::StreamService;
use crate::error::{Result, StreamError};
use async_trait::async_trait;
use bytes::Bytes;
use oxbow_core::{
    Cursor, CursorKind, LifecycleState, MessageEntry, PublishOutcome, PublishResult, Record,
    RecordBatch, StartFrom, StreamDescriptor,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Service-side limit on one entry's key+value size.
const MAX_ENTRY_BYTES: usize = 1024 * 1024;

/// Sentinel for "never transitions".
const FROZEN: u32 = u32::MAX;

struct StreamState {
    compartment_id: String,
    descriptor: StreamDescriptor,
    /// `get_stream` polls left before the next lifecycle transition.
    remaining_polls: u32,
    partitions: Vec<Vec<Record>>,
    round_robin: u64,
}

struct CursorState {
    stream_id: String,
    kind: CursorKind,
    /// Next offset to read, per partition.
    positions: Vec<u64>,
    /// Standalone cursors read a single partition.
    only_partition: Option<u32>,
    commit_on_get: bool,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<String, StreamState>,
    cursors: HashMap<String, CursorState>,
    /// Committed offsets per (stream id, group).
    group_offsets: HashMap<(String, String), Vec<u64>>,
    faults: VecDeque<StreamError>,
    reject_key: Option<Bytes>,
    fail_creation: bool,
    next_stream: u64,
    next_token: u64,
}

/// In-memory stream service for tests and examples.
pub struct InMemoryStreamService {
    inner: Mutex<Inner>,
    transition_polls: u32,
}

impl InMemoryStreamService {
    /// Streams transition on the first poll after creation/deletion.
    pub fn new() -> Self {
        Self::with_transition_polls(0)
    }

    /// Streams stay in `Creating`/`Deleting` for `polls` extra `get_stream`
    /// calls before transitioning.
    pub fn with_transition_polls(polls: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            transition_polls: polls,
        }
    }

    /// Streams never leave `Creating`/`Deleting`. For timeout tests.
    pub fn frozen() -> Self {
        Self::with_transition_polls(FROZEN)
    }

    /// Queue an error to be returned by the next service call, ahead of any
    /// real work. Faults are consumed in order.
    pub fn inject_fault(&self, err: StreamError) {
        self.inner.lock().unwrap().faults.push_back(err);
    }

    /// Make `put_messages` reject entries carrying this exact key, producing a
    /// per-entry failure while siblings commit.
    pub fn reject_key(&self, key: impl Into<Bytes>) {
        self.inner.lock().unwrap().reject_key = Some(key.into());
    }

    /// Make provisioning go wrong: streams transition `Creating -> Failed`
    /// instead of activating.
    pub fn fail_creation(&self) {
        self.inner.lock().unwrap().fail_creation = true;
    }

    fn take_fault(inner: &mut Inner) -> Option<StreamError> {
        inner.faults.pop_front()
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn route(state: &mut StreamState, key: Option<&Bytes>) -> usize {
        let parts = state.partitions.len() as u64;
        match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % parts) as usize
            }
            None => {
                let p = state.round_robin % parts;
                state.round_robin += 1;
                p as usize
            }
        }
    }

    fn start_positions(state: &StreamState, start: StartFrom) -> Vec<u64> {
        match start {
            StartFrom::TrimHorizon => vec![0; state.partitions.len()],
            StartFrom::Latest => state.partitions.iter().map(|p| p.len() as u64).collect(),
            StartFrom::AtOffset(offset) => vec![offset; state.partitions.len()],
            StartFrom::AtTime(ts) => state
                .partitions
                .iter()
                .map(|p| {
                    p.iter()
                        .position(|r| r.timestamp >= ts)
                        .unwrap_or(p.len()) as u64
                })
                .collect(),
        }
    }

    fn mint_token(inner: &mut Inner) -> String {
        inner.next_token += 1;
        format!("cur-{:06x}", inner.next_token)
    }
}

impl Default for InMemoryStreamService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamService for InMemoryStreamService {
    async fn list_streams(
        &self,
        compartment_id: &str,
        name: Option<&str>,
        lifecycle_state: Option<LifecycleState>,
    ) -> Result<Vec<StreamDescriptor>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        let mut matches: Vec<StreamDescriptor> = inner
            .streams
            .values()
            .filter(|s| s.compartment_id == compartment_id)
            .filter(|s| name.map_or(true, |n| s.descriptor.name == n))
            .filter(|s| lifecycle_state.map_or(true, |l| s.descriptor.lifecycle_state == l))
            .map(|s| s.descriptor.clone())
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    async fn create_stream(
        &self,
        compartment_id: &str,
        name: &str,
        partitions: u32,
    ) -> Result<StreamDescriptor> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }
        if partitions == 0 {
            return Err(StreamError::InvalidArgument(
                "partitions must be at least 1".into(),
            ));
        }

        let duplicate = inner.streams.values().any(|s| {
            s.compartment_id == compartment_id
                && s.descriptor.name == name
                && matches!(
                    s.descriptor.lifecycle_state,
                    LifecycleState::Creating | LifecycleState::Active
                )
        });
        if duplicate {
            return Err(StreamError::Conflict(format!(
                "a stream named '{name}' already exists"
            )));
        }

        inner.next_stream += 1;
        let id = format!("st-{:06x}", inner.next_stream);
        let descriptor = StreamDescriptor {
            id: id.clone(),
            name: name.to_string(),
            partitions,
            lifecycle_state: LifecycleState::Creating,
        };
        inner.streams.insert(
            id,
            StreamState {
                compartment_id: compartment_id.to_string(),
                descriptor: descriptor.clone(),
                remaining_polls: self.transition_polls,
                partitions: vec![Vec::new(); partitions as usize],
                round_robin: 0,
            },
        );
        Ok(descriptor)
    }

    async fn get_stream(&self, stream_id: &str) -> Result<StreamDescriptor> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        // Fully removed streams stop being reported at all.
        if inner
            .streams
            .get(stream_id)
            .is_some_and(|s| s.descriptor.lifecycle_state == LifecycleState::Deleted)
        {
            inner.streams.remove(stream_id);
            return Err(StreamError::NotFound(format!("stream {stream_id}")));
        }

        let fail_creation = inner.fail_creation;
        let state = inner
            .streams
            .get_mut(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;

        // One lifecycle step per poll, unless frozen.
        if state.remaining_polls != FROZEN {
            match state.descriptor.lifecycle_state {
                LifecycleState::Creating if state.remaining_polls == 0 => {
                    state.descriptor.lifecycle_state = if fail_creation {
                        LifecycleState::Failed
                    } else {
                        LifecycleState::Active
                    };
                }
                LifecycleState::Deleting if state.remaining_polls == 0 => {
                    state.descriptor.lifecycle_state = LifecycleState::Deleted;
                }
                LifecycleState::Creating | LifecycleState::Deleting => {
                    state.remaining_polls -= 1;
                }
                _ => {}
            }
        }

        Ok(state.descriptor.clone())
    }

    async fn delete_stream(&self, stream_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        let transition_polls = self.transition_polls;
        let state = inner
            .streams
            .get_mut(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;

        // Repeated deletes of an already-deleting stream are a no-op.
        if !matches!(
            state.descriptor.lifecycle_state,
            LifecycleState::Deleting | LifecycleState::Deleted
        ) {
            state.descriptor.lifecycle_state = LifecycleState::Deleting;
            state.remaining_polls = transition_polls;
        }
        Ok(())
    }

    async fn put_messages(
        &self,
        stream_id: &str,
        entries: &[MessageEntry],
    ) -> Result<PublishResult> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }
        if entries.is_empty() {
            return Err(StreamError::InvalidArgument("empty batch".into()));
        }

        let reject_key = inner.reject_key.clone();
        let state = inner
            .streams
            .get_mut(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;
        if !state.descriptor.is_active() {
            return Err(StreamError::InvalidArgument(format!(
                "stream {stream_id} is not active"
            )));
        }

        let now = Self::now_ms();
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.estimated_size() > MAX_ENTRY_BYTES {
                outcomes.push(PublishOutcome::Failed {
                    code: "MessageTooLarge".into(),
                    message: format!("entry exceeds {MAX_ENTRY_BYTES} bytes"),
                });
                continue;
            }
            if reject_key.is_some() && entry.key == reject_key {
                outcomes.push(PublishOutcome::Failed {
                    code: "InternalServerError".into(),
                    message: "injected per-entry failure".into(),
                });
                continue;
            }

            let partition = Self::route(state, entry.key.as_ref());
            let log = &mut state.partitions[partition];
            let offset = log.len() as u64;
            log.push(Record {
                partition: partition as u32,
                offset,
                timestamp: now,
                key: entry.key.clone(),
                value: entry.value.clone(),
            });
            outcomes.push(PublishOutcome::Committed {
                partition: partition as u32,
                offset,
            });
        }

        Ok(PublishResult::new(outcomes))
    }

    async fn create_group_cursor(
        &self,
        stream_id: &str,
        group: &str,
        instance: &str,
        start: StartFrom,
        commit_on_get: bool,
    ) -> Result<Cursor> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        let state = inner
            .streams
            .get(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;

        // An established group resumes from its committed offsets; `start`
        // only seeds a brand-new group.
        let committed = inner
            .group_offsets
            .get(&(stream_id.to_string(), group.to_string()));
        let positions = match committed {
            Some(stored) => stored.clone(),
            None => Self::start_positions(state, start),
        };

        let kind = CursorKind::Group {
            group: group.to_string(),
            instance: instance.to_string(),
        };
        let token = Self::mint_token(&mut inner);
        inner.cursors.insert(
            token.clone(),
            CursorState {
                stream_id: stream_id.to_string(),
                kind: kind.clone(),
                positions,
                only_partition: None,
                commit_on_get,
            },
        );
        Ok(Cursor::new(token, kind))
    }

    async fn create_cursor(
        &self,
        stream_id: &str,
        partition: u32,
        start: StartFrom,
    ) -> Result<Cursor> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        let state = inner
            .streams
            .get(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;
        if partition >= state.descriptor.partitions {
            return Err(StreamError::InvalidArgument(format!(
                "partition {partition} out of range for stream with {} partitions",
                state.descriptor.partitions
            )));
        }

        let positions = Self::start_positions(state, start);
        let token = Self::mint_token(&mut inner);
        inner.cursors.insert(
            token.clone(),
            CursorState {
                stream_id: stream_id.to_string(),
                kind: CursorKind::Standalone,
                positions,
                only_partition: Some(partition),
                commit_on_get: false,
            },
        );
        Ok(Cursor::new(token, CursorKind::Standalone))
    }

    async fn get_messages(
        &self,
        stream_id: &str,
        cursor: &Cursor,
        limit: usize,
    ) -> Result<RecordBatch> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(fault) = Self::take_fault(&mut inner) {
            return Err(fault);
        }

        // Presenting a token consumes it; a stale or already-advanced token
        // is unknown from here on.
        let mut state = inner.cursors.remove(cursor.token()).ok_or_else(|| {
            StreamError::NotFound(format!(
                "cursor token {} unknown or already consumed",
                cursor.token()
            ))
        })?;
        if state.stream_id != stream_id {
            return Err(StreamError::InvalidArgument(
                "cursor belongs to a different stream".into(),
            ));
        }

        let stream = inner
            .streams
            .get(stream_id)
            .ok_or_else(|| StreamError::NotFound(format!("stream {stream_id}")))?;

        let mut records = Vec::new();
        let partitions: Vec<usize> = match state.only_partition {
            Some(p) => vec![p as usize],
            None => (0..stream.partitions.len()).collect(),
        };
        for p in partitions {
            let log = &stream.partitions[p];
            while records.len() < limit && (state.positions[p] as usize) < log.len() {
                records.push(log[state.positions[p] as usize].clone());
                state.positions[p] += 1;
            }
        }

        if state.commit_on_get {
            if let CursorKind::Group { ref group, .. } = state.kind {
                inner.group_offsets.insert(
                    (stream_id.to_string(), group.clone()),
                    state.positions.clone(),
                );
            }
        }

        let kind = state.kind.clone();
        let token = Self::mint_token(&mut inner);
        inner.cursors.insert(token.clone(), state);

        Ok(RecordBatch {
            records,
            next_cursor: Cursor::new(token, kind),
        })
    }
}
