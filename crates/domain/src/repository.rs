//! Loading aggregates and committing their events.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use event_store::{Commit, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::locks::StreamLocks;

/// An aggregate together with the stream version it was loaded at.
///
/// Events recorded through a [`UnitOfWork`] are applied immediately, so the
/// aggregate always reflects what the pending commit will produce.
#[derive(Debug, Clone, Default)]
pub struct Loaded<A> {
    aggregate: A,
    expected: Version,
}

impl<A: Aggregate> Loaded<A> {
    /// A stream with no events yet.
    pub fn fresh() -> Self {
        Self {
            aggregate: A::default(),
            expected: Version::initial(),
        }
    }

    /// Version the stream must still be at when the commit lands.
    pub fn expected_version(&self) -> Version {
        self.expected
    }

    pub fn into_inner(self) -> A {
        self.aggregate
    }
}

impl<A> std::ops::Deref for Loaded<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.aggregate
    }
}

struct PendingStream {
    aggregate_id: AggregateId,
    expected: Version,
    events: Vec<EventEnvelope>,
}

/// Events staged across one or more streams, committed all at once.
pub struct UnitOfWork {
    actor: Actor,
    at: DateTime<Utc>,
    streams: Vec<PendingStream>,
}

impl UnitOfWork {
    pub fn new(actor: &Actor, at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.clone(),
            at,
            streams: Vec::new(),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Timestamp shared by every event in this unit.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Applies `events` to the loaded aggregate and stages them for commit.
    pub fn record<A: Aggregate>(
        &mut self,
        aggregate_id: AggregateId,
        loaded: &mut Loaded<A>,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let index = match self
            .streams
            .iter()
            .position(|s| s.aggregate_id == aggregate_id)
        {
            Some(index) => index,
            None => {
                self.streams.push(PendingStream {
                    aggregate_id,
                    expected: loaded.expected,
                    events: Vec::new(),
                });
                self.streams.len() - 1
            }
        };

        for event in events {
            let version = loaded.aggregate.version().next();
            let envelope = EventEnvelope::from_payload(
                aggregate_id,
                A::aggregate_type(),
                event.event_type(),
                version,
                &event,
            )?
            .with_timestamp(self.at)
            .with_metadata("actor_id", serde_json::json!(self.actor.id))
            .with_metadata("actor_role", serde_json::json!(self.actor.role.as_str()));

            self.streams[index].events.push(envelope);
            loaded.aggregate.apply(event);
            loaded.aggregate.set_version(version);
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.streams.iter().map(|s| s.events.len()).sum()
    }

    fn into_commit(self) -> Commit {
        let mut commit = Commit::new();
        for stream in self.streams {
            commit.push(stream.aggregate_id, stream.expected, stream.events);
        }
        commit
    }
}

/// Result of a single-stream command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// Event-sourced persistence shared by the domain services.
pub struct Repository<S> {
    store: S,
    locks: StreamLocks,
}

impl<S: Clone> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: EventStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: StreamLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &StreamLocks {
        &self.locks
    }

    /// Replays a stream. A missing stream yields a fresh aggregate.
    pub async fn load<A: Aggregate>(&self, aggregate_id: AggregateId) -> Result<Loaded<A>, DomainError> {
        let envelopes = self.store.load_stream(aggregate_id).await?;

        let mut loaded = Loaded::<A>::fresh();
        for envelope in envelopes {
            let event: A::Event = envelope.decode()?;
            loaded.aggregate.apply(event);
            loaded.aggregate.set_version(envelope.version);
            loaded.expected = envelope.version;
        }

        Ok(loaded)
    }

    /// Loads an aggregate that must exist and not be deleted.
    pub async fn load_live<A: Aggregate>(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Loaded<A>, DomainError> {
        let loaded = self.load::<A>(aggregate_id).await?;
        if loaded.is_live() {
            Ok(loaded)
        } else {
            Err(DomainError::not_found(A::aggregate_type(), aggregate_id))
        }
    }

    /// Commits every staged event atomically. An empty unit is a no-op.
    pub async fn commit(&self, uow: UnitOfWork) -> Result<(), DomainError> {
        if uow.is_empty() {
            return Ok(());
        }
        self.store.commit(uow.into_commit()).await?;
        Ok(())
    }

    /// Runs a command against one stream under its lock and persists the
    /// resulting events.
    pub async fn execute<A, F>(
        &self,
        aggregate_id: AggregateId,
        actor: &Actor,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: Aggregate,
        F: FnOnce(&A, DateTime<Utc>) -> Result<Vec<A::Event>, A::Error>,
    {
        let _guard = self.locks.acquire(&[aggregate_id]).await;
        let mut loaded = self.load::<A>(aggregate_id).await?;
        let at = Utc::now();

        let events = command_fn(&loaded.aggregate, at).map_err(Into::<DomainError>::into)?;

        let mut uow = UnitOfWork::new(actor, at);
        uow.record(aggregate_id, &mut loaded, events.clone())?;
        self.commit(uow).await?;

        let new_version = loaded.aggregate.version();
        Ok(CommandResult {
            aggregate: loaded.into_inner(),
            events,
            new_version,
        })
    }
}
