use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Position, Result, Version,
    store::{Commit, EventStore, EventStream},
};

#[derive(Default)]
struct MemoryState {
    /// All committed events, in position order.
    events: Vec<EventEnvelope>,

    /// Indexes into `events` for each stream, in version order.
    streams: HashMap<AggregateId, Vec<usize>>,
}

impl MemoryState {
    fn version_of(&self, aggregate_id: &AggregateId) -> Option<Version> {
        let last = *self.streams.get(aggregate_id)?.last()?;
        Some(self.events[last].version)
    }
}

/// In-memory event store used for tests and single-process deployments.
///
/// A commit holds the write lock for its whole duration, so multi-stream
/// commits are atomic and readers never observe half of one.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn commit(&self, commit: Commit) -> Result<()> {
        commit.validate()?;

        let mut state = self.state.write().await;

        // Check every stream before writing anything.
        for append in commit.appends() {
            let actual = state
                .version_of(&append.aggregate_id)
                .unwrap_or_else(Version::initial);
            if actual != append.expected_version {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: append.aggregate_id,
                    expected: append.expected_version,
                    actual,
                });
            }
        }

        let mut position = Position::new(state.events.len() as i64);
        for append in commit.into_appends() {
            let aggregate_id = append.aggregate_id;
            for mut event in append.events {
                position = position.next();
                event.position = position;
                let index = state.events.len();
                state.events.push(event);
                state.streams.entry(aggregate_id).or_default().push(index);
            }
        }

        Ok(())
    }

    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let Some(indexes) = state.streams.get(&aggregate_id) else {
            return Ok(Vec::new());
        };
        Ok(indexes.iter().map(|&i| state.events[i].clone()).collect())
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.state.read().await.version_of(&aggregate_id))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let matching = state.events.iter().filter(|e| query.matches(e)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn stream_from(&self, after: Position) -> Result<EventStream> {
        use futures_util::stream;

        let state = self.state.read().await;
        let start = usize::try_from(after.as_i64()).unwrap_or(0);
        let events: Vec<_> = state.events.iter().skip(start).cloned().collect();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::EventStoreExt;

    fn event(aggregate_id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::new(
            aggregate_id,
            "Test",
            event_type,
            Version::new(version),
            serde_json::json!({"test": true}),
        )
    }

    #[tokio::test]
    async fn append_assigns_positions() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(id, Version::initial(), vec![event(id, 1, "A"), event(id, 2, "B")])
            .await
            .unwrap();

        let events = store.load_stream(id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].position, Position::new(1));
        assert_eq!(events[1].position, Position::new(2));
        assert_eq!(store.stream_version(id).await.unwrap(), Some(Version::new(2)));
    }

    #[tokio::test]
    async fn multi_stream_commit_is_atomic() {
        let store = InMemoryEventStore::new();
        let order = AggregateId::new();
        let client = AggregateId::new();

        store
            .append(client, Version::initial(), vec![event(client, 1, "ClientRegistered")])
            .await
            .unwrap();

        // Client expectation is stale: the whole commit must be rejected.
        let result = store
            .commit(
                Commit::new()
                    .stream(order, Version::initial(), vec![event(order, 1, "OrderCreated")])
                    .stream(client, Version::initial(), vec![event(client, 1, "Recorded")]),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { aggregate_id, .. }) if aggregate_id == client
        ));
        assert!(!store.stream_exists(order).await.unwrap());
        assert_eq!(store.event_count().await, 1);

        store
            .commit(
                Commit::new()
                    .stream(order, Version::initial(), vec![event(order, 1, "OrderCreated")])
                    .stream(client, Version::first(), vec![event(client, 2, "Recorded")]),
            )
            .await
            .unwrap();
        assert_eq!(store.event_count().await, 3);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(id, Version::initial(), vec![event(id, 1, "A")])
            .await
            .unwrap();
        let result = store
            .append(id, Version::initial(), vec![event(id, 1, "B")])
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn query_by_type_and_limit() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .append(a, Version::initial(), vec![event(a, 1, "OrderCreated")])
            .await
            .unwrap();
        store
            .append(b, Version::initial(), vec![event(b, 1, "OrderCreated")])
            .await
            .unwrap();
        store
            .append(a, Version::first(), vec![event(a, 2, "OrderDeleted")])
            .await
            .unwrap();

        let created = store
            .query_events(EventQuery::new().event_type("OrderCreated"))
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let first = store
            .query_events(EventQuery::new().limit(1))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].aggregate_id, a);
    }

    #[tokio::test]
    async fn stream_from_skips_seen_events() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                id,
                Version::initial(),
                vec![event(id, 1, "A"), event(id, 2, "B"), event(id, 3, "C")],
            )
            .await
            .unwrap();

        let all: Vec<_> = store.stream_all().await.unwrap().collect().await;
        assert_eq!(all.len(), 3);

        let tail: Vec<_> = store
            .stream_from(Position::new(2))
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].as_ref().unwrap().event_type, "C");
    }

    #[tokio::test]
    async fn load_stream_returns_only_that_stream() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .commit(
                Commit::new()
                    .stream(a, Version::initial(), vec![event(a, 1, "A1")])
                    .stream(b, Version::initial(), vec![event(b, 1, "B1")]),
            )
            .await
            .unwrap();
        store
            .append(a, Version::first(), vec![event(a, 2, "A2")])
            .await
            .unwrap();

        let events = store.load_stream(a).await.unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, ["A1", "A2"]);
        assert_eq!(events[1].position, Position::new(3));
        assert_eq!(store.load_stream(b).await.unwrap().len(), 1);
        assert_eq!(store.stream_version(a).await.unwrap(), Some(Version::new(2)));
    }

    #[tokio::test]
    async fn missing_stream_has_no_version() {
        let store = InMemoryEventStore::new();
        assert!(store.stream_version(AggregateId::new()).await.unwrap().is_none());
        assert!(store.load_stream(AggregateId::new()).await.unwrap().is_empty());
    }
}
