use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventQuery, EventStoreError, Position, Result, Version};

/// Events destined for a single stream within a [`Commit`].
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub aggregate_id: AggregateId,

    /// Version the stream must be at before this append.
    pub expected_version: Version,

    pub events: Vec<EventEnvelope>,
}

/// A set of appends that must land together or not at all.
///
/// Order creation, for example, touches the order stream, the owning client's
/// stream and the monthly order-number sequence in one commit.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    appends: Vec<StreamAppend>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds events for one stream. Empty event lists are skipped.
    pub fn stream(
        mut self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Self {
        self.push(aggregate_id, expected_version, events);
        self
    }

    pub fn push(
        &mut self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) {
        if events.is_empty() {
            return;
        }
        self.appends.push(StreamAppend {
            aggregate_id,
            expected_version,
            events,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.appends.is_empty()
    }

    pub fn appends(&self) -> &[StreamAppend] {
        &self.appends
    }

    pub fn into_appends(self) -> Vec<StreamAppend> {
        self.appends
    }

    pub fn event_count(&self) -> usize {
        self.appends.iter().map(|a| a.events.len()).sum()
    }

    /// Checks the commit is well formed before any backend touches storage.
    ///
    /// Each stream may appear once, every event must belong to its stream, and
    /// versions must run contiguously from `expected_version + 1`.
    pub fn validate(&self) -> Result<()> {
        if self.appends.is_empty() {
            return Err(EventStoreError::InvalidCommit(
                "commit contains no events".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for append in &self.appends {
            if !seen.insert(append.aggregate_id) {
                return Err(EventStoreError::InvalidCommit(format!(
                    "stream {} appears more than once",
                    append.aggregate_id
                )));
            }

            let mut expected = append.expected_version;
            for event in &append.events {
                if event.aggregate_id != append.aggregate_id {
                    return Err(EventStoreError::InvalidCommit(format!(
                        "event {} targets stream {} but was appended to {}",
                        event.event_id, event.aggregate_id, append.aggregate_id
                    )));
                }
                expected = expected.next();
                if event.version != expected {
                    return Err(EventStoreError::InvalidCommit(format!(
                        "stream {}: expected event version {}, got {}",
                        append.aggregate_id, expected, event.version
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A stream of committed events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Core trait for event store implementations.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Applies a commit atomically.
    ///
    /// Fails with `ConcurrencyConflict` when any stream is not at its expected
    /// version, in which case nothing is written.
    async fn commit(&self, commit: Commit) -> Result<()>;

    /// Returns all events of one stream in version order.
    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Returns the current version of a stream, or `None` if it has no events.
    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Returns events matching a query, in position order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Streams every event committed after `after`, in position order.
    async fn stream_from(&self, after: Position) -> Result<EventStream>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends events to a single stream.
    async fn append(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<()> {
        self.commit(Commit::new().stream(aggregate_id, expected_version, events))
            .await
    }

    async fn stream_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(aggregate_id).await?.is_some())
    }

    async fn stream_all(&self) -> Result<EventStream> {
        self.stream_from(Position::start()).await
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}
